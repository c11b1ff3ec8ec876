// Two-phase call-graph construction.
//
// Phase 1 analyzes each file independently (rayon for the sync entry point,
// tokio with a bounded semaphore for the async one). Phase 2 is serial:
// aggregate the project registry, wire imported classes into file trackers,
// retry references the first pass could not resolve, and freeze the snapshot.
// A cancellation flag is honored at file boundaries; in-flight analysis
// always completes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use skein_graphs::extract::FileGraph;
use skein_graphs::languages::{parse_source, LanguageRegistry};
use skein_graphs::resolver::{strategy_for, ImportRecord, ResolutionContext};
use skein_graphs::type_tracking::{FileTypeTracker, ImportedClassInfo, LocalTypeTracker};
use skein_graphs::{DefinitionKind, Diagnostic};

use crate::analysis::{analyze_file, make_call, FileAnalysis, FunctionCall};
use crate::config::SkeinConfig;
use crate::error::{Result, SkeinError};
use crate::project::{FileRecord, FileState, ProjectSnapshot};
use crate::registry::ProjectRegistry;

/// A source file handed to the builder. The builder never reads the
/// filesystem itself.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub source: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Cooperative cancellation, checked at file boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The call-graph builder: language registry plus build options.
#[derive(Debug)]
pub struct CallGraphBuilder {
    languages: LanguageRegistry,
    max_concurrent_files: usize,
    cancel: Option<CancelFlag>,
}

impl Default for CallGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self {
            languages: LanguageRegistry::new(),
            max_concurrent_files: 100,
            cancel: None,
        }
    }

    pub fn with_config(config: &SkeinConfig) -> Self {
        Self {
            languages: LanguageRegistry::new(),
            max_concurrent_files: config.build.max_concurrent_files.max(1),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Synchronous build: Phase 1 fans out over rayon, Phase 2 runs serially.
    pub fn build(&self, sources: Vec<FileSource>) -> Result<ProjectSnapshot> {
        let mut sources = sources;
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        self.reject_unknown_languages(&sources)?;
        let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();

        let processed: Vec<ProcessedFile> = sources
            .par_iter()
            .map(|file| {
                if self.cancelled() {
                    return ProcessedFile::Cancelled;
                }
                self.process_file(file, &paths)
            })
            .collect();

        self.finish(sources, processed)
    }

    /// Asynchronous build: Phase 1 is scheduled on blocking workers, at most
    /// `max_concurrent_files` in flight; the sync form never suspends.
    pub async fn build_async(&self, sources: Vec<FileSource>) -> Result<ProjectSnapshot> {
        let mut sources = sources;
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        self.reject_unknown_languages(&sources)?;
        let paths: Arc<Vec<PathBuf>> =
            Arc::new(sources.iter().map(|s| s.path.clone()).collect());

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.max_concurrent_files));
        let mut handles = Vec::with_capacity(sources.len());
        for file in sources.clone() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                handles.push(None);
                continue;
            };
            if self.cancelled() {
                drop(permit);
                handles.push(None);
                continue;
            }
            let paths = Arc::clone(&paths);
            let registry = LanguageRegistry::new();
            handles.push(Some(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                process_file_with(&registry, &file, &paths)
            })));
        }

        let mut processed = Vec::with_capacity(handles.len());
        for (handle, file) in handles.into_iter().zip(&sources) {
            match handle {
                Some(h) => match h.await {
                    Ok(outcome) => processed.push(outcome),
                    Err(err) => {
                        tracing::warn!(file = %file.path.display(), %err, "analysis task failed");
                        processed.push(ProcessedFile::ParseFailed(Diagnostic::ParseFailure {
                            file: file.path.clone(),
                            message: format!("analysis task failed: {err}"),
                        }));
                    }
                },
                None => processed.push(ProcessedFile::Cancelled),
            }
        }

        self.finish(sources, processed)
    }

    fn reject_unknown_languages(&self, sources: &[FileSource]) -> Result<()> {
        for file in sources {
            if self.languages.for_file(&file.path).is_none() {
                return Err(SkeinError::UnknownLanguage(
                    file.path.display().to_string(),
                ));
            }
        }
        Ok(())
    }

    fn process_file(&self, file: &FileSource, paths: &[PathBuf]) -> ProcessedFile {
        process_file_with(&self.languages, file, paths)
    }

    fn finish(
        &self,
        sources: Vec<FileSource>,
        processed: Vec<ProcessedFile>,
    ) -> Result<ProjectSnapshot> {
        let mut records: BTreeMap<PathBuf, FileRecord> = BTreeMap::new();
        let mut graphs: BTreeMap<PathBuf, FileGraph> = BTreeMap::new();
        let mut analyses: BTreeMap<PathBuf, FileAnalysis> = BTreeMap::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut parse_failures = 0usize;

        for (file, outcome) in sources.into_iter().zip(processed) {
            match outcome {
                ProcessedFile::Analyzed {
                    graph,
                    analysis,
                    language,
                } => {
                    records.insert(
                        file.path.clone(),
                        FileRecord {
                            source: file.source,
                            language,
                            state: FileState::Analyzed,
                        },
                    );
                    graphs.insert(file.path.clone(), graph);
                    analyses.insert(file.path, analysis);
                }
                ProcessedFile::ParseFailed(diag) => {
                    parse_failures += 1;
                    diagnostics.push(diag);
                }
                ProcessedFile::Cancelled => {}
            }
        }

        if !records.is_empty() || parse_failures == 0 {
            Ok(assemble(records, graphs, analyses, diagnostics))
        } else {
            Err(SkeinError::AllFilesFailed(parse_failures))
        }
    }

    // ── Incremental updates ────────────────────────────────────────

    /// New snapshot with one file added. The prior snapshot is untouched.
    pub fn add_file(
        &self,
        snapshot: &ProjectSnapshot,
        path: PathBuf,
        source: String,
    ) -> Result<ProjectSnapshot> {
        self.update_file(snapshot, path, source)
    }

    /// New snapshot with one file replaced: the file drops back to `parsed`,
    /// is re-analyzed, and Phase 2 aggregation re-runs over all files.
    pub fn update_file(
        &self,
        snapshot: &ProjectSnapshot,
        path: PathBuf,
        source: String,
    ) -> Result<ProjectSnapshot> {
        if self.languages.for_file(&path).is_none() {
            return Err(SkeinError::UnknownLanguage(path.display().to_string()));
        }

        let mut records = snapshot.records().clone();
        let mut graphs = snapshot.graphs().clone();
        let mut analyses = snapshot.analyses().clone();
        let mut diagnostics: Vec<Diagnostic> = snapshot
            .diagnostics()
            .iter()
            .filter(|d| !diag_is_for(d, &path))
            .cloned()
            .collect();

        let mut paths: Vec<PathBuf> = graphs.keys().cloned().collect();
        if !paths.contains(&path) {
            paths.push(path.clone());
            paths.sort();
        }

        let file = FileSource::new(path.clone(), source);
        match self.process_file(&file, &paths) {
            ProcessedFile::Analyzed {
                graph,
                analysis,
                language,
            } => {
                records.insert(
                    path.clone(),
                    FileRecord {
                        source: file.source,
                        language,
                        state: FileState::Analyzed,
                    },
                );
                graphs.insert(path.clone(), graph);
                analyses.insert(path, analysis);
            }
            ProcessedFile::ParseFailed(diag) => {
                // A broken edit removes the file's slice until it parses again.
                records.remove(&path);
                graphs.remove(&path);
                analyses.remove(&path);
                diagnostics.push(diag);
            }
            ProcessedFile::Cancelled => {}
        }

        Ok(assemble(records, graphs, analyses, diagnostics))
    }

    /// New snapshot with one file removed.
    pub fn remove_file(&self, snapshot: &ProjectSnapshot, path: &PathBuf) -> ProjectSnapshot {
        let mut records = snapshot.records().clone();
        let mut graphs = snapshot.graphs().clone();
        let mut analyses = snapshot.analyses().clone();
        let diagnostics: Vec<Diagnostic> = snapshot
            .diagnostics()
            .iter()
            .filter(|d| !diag_is_for(d, path))
            .cloned()
            .collect();

        records.remove(path);
        graphs.remove(path);
        analyses.remove(path);

        assemble(records, graphs, analyses, diagnostics)
    }
}

enum ProcessedFile {
    Analyzed {
        graph: FileGraph,
        analysis: FileAnalysis,
        language: skein_graphs::Language,
    },
    ParseFailed(Diagnostic),
    Cancelled,
}

fn process_file_with(
    languages: &LanguageRegistry,
    file: &FileSource,
    paths: &[PathBuf],
) -> ProcessedFile {
    let Some(support) = languages.for_file(&file.path) else {
        // Checked up front; defensive here.
        return ProcessedFile::ParseFailed(Diagnostic::UnknownLanguage {
            file: file.path.clone(),
        });
    };

    let tree = match parse_source(support.as_ref(), &file.source, &file.path) {
        Ok(tree) => tree,
        Err(err) => {
            tracing::warn!(file = %file.path.display(), %err, "parse failed, skipping file");
            return ProcessedFile::ParseFailed(Diagnostic::ParseFailure {
                file: file.path.clone(),
                message: err.to_string(),
            });
        }
    };

    let graph = FileGraph::extract(support.as_ref(), &tree, &file.source, &file.path);
    let analysis = analyze_file(&graph, paths, None);

    ProcessedFile::Analyzed {
        graph,
        analysis,
        language: support.language(),
    }
}

fn diag_is_for(diag: &Diagnostic, path: &PathBuf) -> bool {
    match diag {
        Diagnostic::ParseFailure { file, .. }
        | Diagnostic::UnknownLanguage { file }
        | Diagnostic::ResolverCycle { file, .. }
        | Diagnostic::OrphanAttachmentAmbiguous { file, .. } => file == path,
        Diagnostic::RegistryConflict { winner, loser, .. } => winner == path || loser == path,
    }
}

// ── Phase 2 ────────────────────────────────────────────────────────

/// Serial cross-file assembly: registry aggregation, import wiring, pending
/// re-resolution, snapshot freeze.
fn assemble(
    records: BTreeMap<PathBuf, FileRecord>,
    graphs: BTreeMap<PathBuf, FileGraph>,
    analyses: BTreeMap<PathBuf, FileAnalysis>,
    mut diagnostics: Vec<Diagnostic>,
) -> ProjectSnapshot {
    let span = tracing::debug_span!("assemble", files = graphs.len());
    let _guard = span.enter();

    let registry = ProjectRegistry::build(&graphs, &analyses);
    diagnostics.extend(registry.diagnostics().iter().cloned());

    let mut resolved_calls: BTreeMap<PathBuf, Vec<FunctionCall>> = BTreeMap::new();
    let mut resolved_imports: BTreeMap<PathBuf, Vec<ImportRecord>> = BTreeMap::new();
    let mut file_trackers: BTreeMap<PathBuf, FileTypeTracker> = BTreeMap::new();
    let empty_local = LocalTypeTracker::new();

    for (path, analysis) in &analyses {
        let graph = &graphs[path];
        let mut tracker = analysis.type_tracker.clone();

        // Wire imports: fill resolutions and register imported classes.
        let mut imports = analysis.imports.clone();
        for record in &mut imports {
            let Some(target_file) = &record.target_file else {
                continue;
            };
            let exported_name = record
                .imported_name
                .clone()
                .unwrap_or_else(|| record.local_name.clone());
            let Some(resolved) = registry.export_terminal(target_file, &exported_name) else {
                continue;
            };
            if resolved.kind == DefinitionKind::Class {
                let info = registry
                    .exported_type_info(&resolved.name)
                    .filter(|i| i.source_file == resolved.file)
                    .cloned()
                    .unwrap_or_else(|| ImportedClassInfo {
                        class_name: resolved.name.clone(),
                        class_def: graphs
                            .get(&resolved.file)
                            .and_then(|g| g.find_class(&resolved.name))
                            .map(|c| c.def.clone()),
                        source_file: resolved.file.clone(),
                    });
                tracker.add_imported_class(record.local_name.clone(), info);
            }
            record.resolved = Some(resolved);
        }

        // Imported classes make more constructor assignments discoverable, so
        // the discovery pass runs again over the wired tables.
        let mut local_trackers = analysis.local_trackers.clone();
        crate::analysis::discover_types_pass(
            graph,
            &imports,
            &mut tracker,
            &mut local_trackers,
            Some(&registry),
        );

        // Retry references the first pass left unresolved, now with the
        // cross-file tables in place.
        let mut calls = analysis.calls.clone();
        let strategy = strategy_for(analysis.language);
        for pending in &analysis.pending {
            let local = local_trackers
                .get(&pending.caller)
                .unwrap_or(&empty_local);
            let ctx = ResolutionContext {
                file: graph,
                imports: &imports,
                local_types: local,
                file_types: &tracker,
                project: Some(&registry),
            };
            if let Some(resolved) =
                strategy.resolve_reference(&pending.reference, &ctx, &mut diagnostics)
            {
                if resolved.is_callable() || resolved.is_builtin {
                    calls.push(make_call(
                        &pending.reference,
                        &pending.caller,
                        &resolved,
                        analysis.language,
                    ));
                }
            }
        }
        calls.sort_by_key(|c| (c.call_location, c.callee.id.clone()));

        resolved_calls.insert(path.clone(), calls);
        resolved_imports.insert(path.clone(), imports);
        file_trackers.insert(path.clone(), tracker);
    }

    let type_registry = registry.exported_types();
    drop(registry);

    let mut records = records;
    for record in records.values_mut() {
        record.state = FileState::Resolved;
    }

    ProjectSnapshot::freeze(
        records,
        graphs,
        analyses,
        resolved_calls,
        resolved_imports,
        file_trackers,
        type_registry,
        diagnostics,
    )
}
