// Immutable project state.
//
// A snapshot owns every per-file artifact plus the Phase 2 aggregates.
// Incremental updates never mutate a snapshot; the builder produces a new one
// and readers keep whichever they hold.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use skein_graphs::extract::FileGraph;
use skein_graphs::resolver::{strategy_for, ImportRecord, ResolutionContext, ResolvedSymbol};
use skein_graphs::symbol_id::SymbolId;
use skein_graphs::type_tracking::{FileTypeTracker, ImportedClassInfo, LocalTypeTracker};
use skein_graphs::{Diagnostic, Language, Position};

use crate::analysis::{FileAnalysis, FunctionCall};
use crate::call_graph::{flatten_call_graph, CallGraph, CallGraphOptions};
use crate::registry::ProjectRegistry;

/// Per-file lifecycle: `untracked → parsed → analyzed → resolved`, with
/// `resolved → parsed` on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Untracked,
    Parsed,
    Analyzed,
    Resolved,
}

impl FileState {
    /// Whether `next` is a legal transition from this state.
    pub fn can_advance_to(self, next: FileState) -> bool {
        use FileState::{Analyzed, Parsed, Resolved, Untracked};
        matches!(
            (self, next),
            (Untracked, Parsed)
                | (Parsed, Analyzed)
                | (Analyzed, Resolved)
                // A changed file discards its analysis and re-parses.
                | (Resolved, Parsed)
        )
    }
}

/// The cached inputs for one file: source text, language, lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub source: String,
    pub language: Language,
    pub state: FileState,
}

/// An immutable, fully-resolved view of the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    records: BTreeMap<PathBuf, FileRecord>,
    graphs: BTreeMap<PathBuf, FileGraph>,
    analyses: BTreeMap<PathBuf, FileAnalysis>,
    resolved_calls: BTreeMap<PathBuf, Vec<FunctionCall>>,
    resolved_imports: BTreeMap<PathBuf, Vec<ImportRecord>>,
    file_trackers: BTreeMap<PathBuf, FileTypeTracker>,
    type_registry: BTreeMap<String, ImportedClassInfo>,
    diagnostics: Vec<Diagnostic>,
}

impl ProjectSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn freeze(
        records: BTreeMap<PathBuf, FileRecord>,
        graphs: BTreeMap<PathBuf, FileGraph>,
        analyses: BTreeMap<PathBuf, FileAnalysis>,
        resolved_calls: BTreeMap<PathBuf, Vec<FunctionCall>>,
        resolved_imports: BTreeMap<PathBuf, Vec<ImportRecord>>,
        file_trackers: BTreeMap<PathBuf, FileTypeTracker>,
        type_registry: BTreeMap<String, ImportedClassInfo>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            records,
            graphs,
            analyses,
            resolved_calls,
            resolved_imports,
            file_trackers,
            type_registry,
            diagnostics,
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn records(&self) -> &BTreeMap<PathBuf, FileRecord> {
        &self.records
    }

    pub fn graphs(&self) -> &BTreeMap<PathBuf, FileGraph> {
        &self.graphs
    }

    pub fn analyses(&self) -> &BTreeMap<PathBuf, FileAnalysis> {
        &self.analyses
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn file_state(&self, path: &Path) -> FileState {
        self.records
            .get(path)
            .map_or(FileState::Untracked, |r| r.state)
    }

    pub fn file_tracker(&self, path: &Path) -> Option<&FileTypeTracker> {
        self.file_trackers.get(path)
    }

    /// The project type registry: exported type name → class binding.
    pub fn type_registry(&self) -> &BTreeMap<String, ImportedClassInfo> {
        &self.type_registry
    }

    // ── Graph and queries ──────────────────────────────────────────

    /// Flatten the resolved calls into a queryable graph.
    pub fn get_call_graph(&self, options: &CallGraphOptions) -> CallGraph {
        flatten_call_graph(&self.graphs, &self.resolved_calls, options)
    }

    /// Calls whose caller is the given definition.
    pub fn get_calls_from_definition(&self, caller: &SymbolId) -> Vec<&FunctionCall> {
        let file = Path::new(caller.file_part());
        self.resolved_calls
            .get(file)
            .map(|calls| calls.iter().filter(|c| &c.caller == caller).collect())
            .unwrap_or_default()
    }

    /// Calls made at module load time for a file.
    pub fn get_module_level_calls(&self, file: &Path) -> Vec<&FunctionCall> {
        let module = SymbolId::module(file);
        self.resolved_calls
            .get(file)
            .map(|calls| calls.iter().filter(|c| c.caller == module).collect())
            .unwrap_or_default()
    }

    /// Whether a file exports the given name.
    pub fn is_definition_exported(&self, file: &Path, name: &str) -> bool {
        self.analyses
            .get(file)
            .is_some_and(|a| a.exports.iter().any(|e| e.export_name == name))
    }
}

/// Host hooks for name→definition lookups. The default implementations go
/// through the resolver; alternate hosts may override either.
pub trait DefinitionHost {
    /// The definition referenced at a position, if any reference sits there.
    fn go_to_definition(&self, file: &Path, position: Position) -> Option<ResolvedSymbol>;

    /// The file's import bindings with their resolved definitions.
    fn get_imports_with_definitions(&self, file: &Path) -> Vec<ImportRecord>;
}

impl DefinitionHost for ProjectSnapshot {
    fn go_to_definition(&self, file: &Path, position: Position) -> Option<ResolvedSymbol> {
        let graph = self.graphs.get(file)?;
        let reference = graph
            .references
            .iter()
            .find(|r| r.location.range.contains(position))?;

        let registry = ProjectRegistry::build(&self.graphs, &self.analyses);
        let analysis = self.analyses.get(file)?;
        let empty_imports = Vec::new();
        let imports = self.resolved_imports.get(file).unwrap_or(&empty_imports);
        let empty_local = LocalTypeTracker::new();
        let empty_tracker = FileTypeTracker::new();
        let tracker = self.file_trackers.get(file).unwrap_or(&empty_tracker);

        // Use the caller's local bindings when the position sits in a body.
        let local = analysis
            .local_trackers
            .iter()
            .find(|(id, _)| {
                self.resolved_calls.get(file).is_some_and(|calls| {
                    calls
                        .iter()
                        .any(|c| &&c.caller == id && c.call_range.contains(position))
                })
            })
            .map_or(&empty_local, |(_, tracker)| tracker);

        let ctx = ResolutionContext {
            file: graph,
            imports,
            local_types: local,
            file_types: tracker,
            project: Some(&registry),
        };
        let mut diagnostics = Vec::new();
        strategy_for(graph.language).resolve_reference(reference, &ctx, &mut diagnostics)
    }

    fn get_imports_with_definitions(&self, file: &Path) -> Vec<ImportRecord> {
        self.resolved_imports.get(file).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CallGraphBuilder, FileSource};

    #[test]
    fn state_machine_transitions() {
        assert!(FileState::Untracked.can_advance_to(FileState::Parsed));
        assert!(FileState::Parsed.can_advance_to(FileState::Analyzed));
        assert!(FileState::Analyzed.can_advance_to(FileState::Resolved));
        assert!(FileState::Resolved.can_advance_to(FileState::Parsed));

        assert!(!FileState::Untracked.can_advance_to(FileState::Resolved));
        assert!(!FileState::Parsed.can_advance_to(FileState::Resolved));
        assert!(!FileState::Resolved.can_advance_to(FileState::Analyzed));
    }

    #[test]
    fn snapshot_files_end_resolved() {
        let snapshot = CallGraphBuilder::new()
            .build(vec![FileSource::new("a.js", "function f() {}\n")])
            .unwrap();
        assert_eq!(snapshot.file_state(Path::new("a.js")), FileState::Resolved);
        assert_eq!(
            snapshot.file_state(Path::new("missing.js")),
            FileState::Untracked
        );
    }

    #[test]
    fn module_level_calls_query() {
        let snapshot = CallGraphBuilder::new()
            .build(vec![FileSource::new(
                "m.py",
                "def setup():\n    pass\n\nsetup()\n",
            )])
            .unwrap();
        let calls = snapshot.get_module_level_calls(Path::new("m.py"));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee.id.as_str(), "m.py#setup");
    }

    #[test]
    fn calls_from_definition_query() {
        let snapshot = CallGraphBuilder::new()
            .build(vec![FileSource::new(
                "a.js",
                "function f() {}\nfunction g() { f(); }\n",
            )])
            .unwrap();
        let calls = snapshot.get_calls_from_definition(&SymbolId("a.js#g".into()));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee.id.as_str(), "a.js#f");
    }

    #[test]
    fn export_query() {
        let snapshot = CallGraphBuilder::new()
            .build(vec![FileSource::new(
                "util.ts",
                "export function add(a, b) { return a + b; }\nfunction local() {}\n",
            )])
            .unwrap();
        assert!(snapshot.is_definition_exported(Path::new("util.ts"), "add"));
        assert!(!snapshot.is_definition_exported(Path::new("util.ts"), "local"));
    }

    #[test]
    fn go_to_definition_hook() {
        let snapshot = CallGraphBuilder::new()
            .build(vec![FileSource::new(
                "a.js",
                "function target() {}\ntarget();\n",
            )])
            .unwrap();
        // The call site on line 1.
        let resolved = snapshot
            .go_to_definition(Path::new("a.js"), Position::new(1, 2))
            .expect("definition");
        assert_eq!(resolved.id.as_str(), "a.js#target");
    }

    #[test]
    fn imports_with_definitions_hook() {
        let snapshot = CallGraphBuilder::new()
            .build(vec![
                FileSource::new("util.js", "export function add(a, b) { return a + b; }\n"),
                FileSource::new("app.js", "import { add } from './util';\nadd(1, 2);\n"),
            ])
            .unwrap();
        let imports = snapshot.get_imports_with_definitions(Path::new("app.js"));
        assert_eq!(imports.len(), 1);
        let resolved = imports[0].resolved.as_ref().expect("resolved import");
        assert_eq!(resolved.id.as_str(), "util.js#add");
    }
}
