// Per-file extraction: raw captures → normalized captures → scope tree,
// structured definitions, and typed references, assembled into a `FileGraph`.
//
// A file's scopes, definitions, and references are always rebuilt together
// from the same parse snapshot; a `FileGraph` is never partially updated.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::{normalize_captures, CaptureCategory, CaptureEntity, NormalizedCapture};
use crate::definitions::{
    ClassDefinition, Definition, DefinitionBuilder, MethodDefinition, SymbolDefinition,
};
use crate::languages::LanguageSupport;
use crate::references::{ReferenceBuilder, SymbolReference};
use crate::scope::{ProcessingContext, ScopeTree, ROOT_SCOPE};
use crate::symbol_id::SymbolId;
use crate::type_tracking::FileTypeTracker;
use crate::{Diagnostic, Language, Range};

/// `global`/`nonlocal` declarations observed per scope. Resolver input, not a
/// scope-tree mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PragmaTable {
    globals: HashMap<String, BTreeSet<String>>,
    nonlocals: HashMap<String, BTreeSet<String>>,
}

impl PragmaTable {
    pub fn record_global(&mut self, scope_id: &str, name: &str) {
        self.globals
            .entry(scope_id.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn record_nonlocal(&mut self, scope_id: &str, name: &str) {
        self.nonlocals
            .entry(scope_id.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn is_global(&self, scope_id: &str, name: &str) -> bool {
        self.globals
            .get(scope_id)
            .is_some_and(|names| names.contains(name))
    }

    pub fn is_nonlocal(&self, scope_id: &str, name: &str) -> bool {
        self.nonlocals
            .get(scope_id)
            .is_some_and(|names| names.contains(name))
    }
}

/// A named export clause (`export { a as b }`, `export { x } from './y'`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportClause {
    pub local_name: String,
    pub export_name: String,
    pub is_default: bool,
    pub is_reexport: bool,
    /// Module specifier for re-exports.
    pub source: Option<String>,
    pub range: Range,
}

/// A callable (or type) enumerated from a file, with its graph identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callable {
    pub id: SymbolId,
    pub symbol: SymbolDefinition,
    /// Owning class/impl-target name for methods and constructors.
    pub owner: Option<String>,
}

/// Everything extracted from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileGraph {
    pub file_path: PathBuf,
    pub language: Language,
    pub scopes: ScopeTree,
    pub definitions: Vec<Definition>,
    pub references: Vec<SymbolReference>,
    pub pragmas: PragmaTable,
    /// Names restricted by a literal `__all__` list, when one was present.
    pub explicit_exports: Option<Vec<String>>,
    /// Named export clauses, including re-exports.
    pub export_clauses: Vec<ExportClause>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileGraph {
    /// Run the full per-file pipeline over a parsed tree.
    pub fn extract(
        support: &dyn LanguageSupport,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Self {
        let raw = support.collect_captures(tree, source);
        let captures = normalize_captures(support.capture_config(), &raw, source, path);
        Self::from_captures(support.language(), &captures, path)
    }

    /// Assemble a file graph from already-normalized captures.
    pub fn from_captures(
        language: Language,
        captures: &[NormalizedCapture],
        path: &Path,
    ) -> Self {
        let scopes = ScopeTree::from_captures(path, captures);
        let ctx = ProcessingContext::new(&scopes);

        let mut def_builder = DefinitionBuilder::new(path);
        let mut ref_builder = ReferenceBuilder::new(path);
        let mut pragmas = PragmaTable::default();
        let mut explicit_exports: Option<Vec<String>> = None;
        let mut export_clauses: Vec<ExportClause> = Vec::new();

        for capture in captures {
            match capture.category {
                CaptureCategory::Definition
                | CaptureCategory::Import
                | CaptureCategory::Decorator => def_builder.add_capture(capture, &ctx),
                CaptureCategory::Reference
                | CaptureCategory::Assignment
                | CaptureCategory::Return
                | CaptureCategory::Type => ref_builder.add_capture(capture, &ctx),
                CaptureCategory::Modifier => {
                    let scope_id = ctx.scope_id_at(capture.location.range.start);
                    match capture.entity {
                        CaptureEntity::Global => {
                            pragmas.record_global(scope_id, &capture.symbol_name);
                        }
                        CaptureEntity::Nonlocal => {
                            pragmas.record_nonlocal(scope_id, &capture.symbol_name);
                        }
                        _ => {}
                    }
                }
                CaptureCategory::Export => {
                    if capture.context.exported_names.is_empty() {
                        export_clauses.push(ExportClause {
                            local_name: capture.symbol_name.clone(),
                            export_name: capture
                                .modifier_text("export_name")
                                .unwrap_or(&capture.symbol_name)
                                .to_string(),
                            is_default: capture.modifier_flag("is_default"),
                            is_reexport: capture.modifier_flag("is_reexport"),
                            source: capture.context.import_source.clone(),
                            range: capture.location.range,
                        });
                    } else {
                        explicit_exports
                            .get_or_insert_with(Vec::new)
                            .extend(capture.context.exported_names.iter().cloned());
                    }
                }
                CaptureCategory::Scope => {}
            }
        }

        let definitions = def_builder.build();
        let references = ref_builder.build();
        let diagnostics = def_builder.diagnostics().to_vec();

        let mut graph = Self {
            file_path: path.to_path_buf(),
            language,
            scopes,
            definitions,
            references,
            pragmas,
            explicit_exports,
            export_clauses,
            diagnostics,
        };
        graph.register_symbols();
        graph
    }

    /// Register every flat symbol into its resolution scope. Scope-owning
    /// definitions bind in the parent of their own scope; hoisted definitions
    /// bind at the nearest function-or-module boundary.
    fn register_symbols(&mut self) {
        let flat: Vec<SymbolDefinition> = self.flat_symbols().cloned().collect();
        let targets: Vec<(usize, SymbolDefinition)> = {
            let ctx = ProcessingContext::new(&self.scopes);
            flat.into_iter()
                .map(|def| {
                    let own = ctx.scope_at(def.range.start);
                    let own_node = self.scopes.node(own);
                    let is_own_scope = def
                        .enclosing_range
                        .is_some_and(|er| own_node.range == er);
                    let mut target = if is_own_scope {
                        own_node.parent.unwrap_or(ROOT_SCOPE)
                    } else {
                        own
                    };
                    if def.is_hoisted {
                        target = self.scopes.hoist_target(target);
                    }
                    (target, def)
                })
                .collect()
        };
        for (scope, def) in targets {
            self.scopes.insert_symbol(scope, def);
        }
    }

    /// All flat symbols: top-level definitions plus class members and
    /// parameters.
    pub fn flat_symbols(&self) -> impl Iterator<Item = &SymbolDefinition> {
        self.definitions.iter().flat_map(|def| {
            let mut out: Vec<&SymbolDefinition> = vec![def.symbol()];
            match def {
                Definition::Class(c) => {
                    for m in &c.methods {
                        out.push(&m.def);
                        out.extend(m.parameters.iter().map(|p| &p.def));
                    }
                    for ctor in &c.constructors {
                        out.push(&ctor.def);
                        out.extend(ctor.parameters.iter().map(|p| &p.def));
                    }
                    for p in &c.properties {
                        out.push(&p.def);
                    }
                }
                Definition::Interface(i) => {
                    for m in &i.members {
                        out.push(&m.def);
                    }
                }
                Definition::Function(f) => {
                    out.extend(f.parameters.iter().map(|p| &p.def));
                }
                Definition::Method(m) => {
                    out.extend(m.parameters.iter().map(|p| &p.def));
                }
                _ => {}
            }
            out
        })
    }

    /// Enumerate graph nodes: functions, classes, methods, constructors,
    /// enums, and namespaces, each with its stable symbol id.
    pub fn callables(&self) -> Vec<Callable> {
        let mut out = Vec::new();
        for def in &self.definitions {
            match def {
                Definition::Class(c) => {
                    out.push(self.top_level_callable(&c.def));
                    for m in &c.methods {
                        out.push(self.member_callable(&c.def.name, &m.def));
                    }
                    for ctor in &c.constructors {
                        out.push(self.member_callable(&c.def.name, &ctor.def));
                    }
                }
                Definition::Function(f) => out.push(self.top_level_callable(&f.def)),
                Definition::Method(m) => {
                    let owner = m.owner.clone().unwrap_or_default();
                    if owner.is_empty() {
                        out.push(self.top_level_callable(&m.def));
                    } else {
                        out.push(self.member_callable(&owner, &m.def));
                    }
                }
                Definition::Enum(e) => out.push(self.top_level_callable(&e.def)),
                Definition::Namespace(s) => out.push(self.top_level_callable(s)),
                _ => {}
            }
        }
        out
    }

    fn top_level_callable(&self, def: &SymbolDefinition) -> Callable {
        Callable {
            id: SymbolId::top_level(&self.file_path, &def.name),
            symbol: def.clone(),
            owner: None,
        }
    }

    fn member_callable(&self, owner: &str, def: &SymbolDefinition) -> Callable {
        Callable {
            id: SymbolId::method(&self.file_path, owner, &def.name),
            symbol: def.clone(),
            owner: Some(owner.to_string()),
        }
    }

    /// The class with the given name, if the file defines one.
    pub fn find_class(&self, name: &str) -> Option<&ClassDefinition> {
        self.definitions.iter().find_map(|d| match d {
            Definition::Class(c) if c.def.name == name => Some(c),
            _ => None,
        })
    }

    /// A method on the given owner, searching attached classes first, then
    /// loose impl-style methods.
    pub fn find_method(&self, owner: &str, name: &str) -> Option<&MethodDefinition> {
        if let Some(class) = self.find_class(owner) {
            if let Some(m) = class.methods.iter().find(|m| m.def.name == name) {
                return Some(m);
            }
        }
        self.definitions.iter().find_map(|d| match d {
            Definition::Method(m)
                if m.def.name == name && m.owner.as_deref() == Some(owner) =>
            {
                Some(m)
            }
            _ => None,
        })
    }

    /// A method whose identifier range lies within the given enclosing range
    /// (the impl-block range search for receiver-less Rust calls).
    pub fn find_method_in_range(&self, range: Range, name: &str) -> Option<&MethodDefinition> {
        let in_classes = self.definitions.iter().find_map(|d| match d {
            Definition::Class(c) => c
                .methods
                .iter()
                .find(|m| m.def.name == name && range.contains_range(&m.def.range)),
            _ => None,
        });
        in_classes.or_else(|| {
            self.definitions.iter().find_map(|d| match d {
                Definition::Method(m)
                    if m.def.name == name && range.contains_range(&m.def.range) =>
                {
                    Some(m)
                }
                _ => None,
            })
        })
    }

    /// Module-level definition with the given name, if any.
    pub fn find_definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.name() == name)
    }

    /// Names this file exports, before project-level wiring: an explicit
    /// `__all__` list wins; otherwise exported flags, falling back for Python
    /// to all module-level names not starting with `_`.
    pub fn export_names(&self) -> Vec<String> {
        if let Some(explicit) = &self.explicit_exports {
            return explicit.clone();
        }
        let mut out: Vec<String> = Vec::new();
        for def in &self.definitions {
            let sym = def.symbol();
            let exported = match self.language {
                // All module-level names not starting with `_`. Module level
                // means the name binds in the root scope.
                Language::Python => {
                    !sym.name.starts_with('_')
                        && self
                            .scopes
                            .root()
                            .symbols
                            .get(&sym.name)
                            .is_some_and(|s| s.range == sym.range)
                }
                _ => sym.is_exported,
            };
            if exported && !out.contains(&sym.name) {
                out.push(sym.name.clone());
            }
        }
        for clause in &self.export_clauses {
            if !out.contains(&clause.export_name) {
                out.push(clause.export_name.clone());
            }
        }
        out
    }

    /// Build the file-level type tracker seeded with this file's exports.
    pub fn seed_type_tracker(&self) -> FileTypeTracker {
        let mut tracker = FileTypeTracker::new();
        for name in self.export_names() {
            tracker.record_export(name);
        }
        tracker
    }
}
