// Project-wide export/import registry (the Phase 2 cross-file tables).
//
// Files are aggregated in path order; the first (lexicographically smallest)
// file to export a type name keeps it, and later conflicting exports are
// diagnosed rather than applied.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use skein_graphs::extract::FileGraph;
use skein_graphs::resolver::{ImportTarget, ProjectView, ResolvedSymbol};
use skein_graphs::symbol_id::SymbolId;
use skein_graphs::type_tracking::ImportedClassInfo;
use skein_graphs::{DefinitionKind, Diagnostic};

use crate::analysis::FileAnalysis;

/// The assembled cross-file lookup tables, borrowed over the file graphs.
pub struct ProjectRegistry<'a> {
    graphs: &'a BTreeMap<PathBuf, FileGraph>,
    exports: HashMap<(PathBuf, String), ResolvedSymbol>,
    exported_types: BTreeMap<String, ImportedClassInfo>,
    import_targets: HashMap<(PathBuf, String), ImportTarget>,
    diagnostics: Vec<Diagnostic>,
}

impl std::fmt::Debug for ProjectRegistry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectRegistry")
            .field("files", &self.graphs.len())
            .field("exports", &self.exports.len())
            .field("exported_types", &self.exported_types.len())
            .finish()
    }
}

impl<'a> ProjectRegistry<'a> {
    /// Aggregate export tables from per-file analyses. `analyses` must be
    /// iterable in file-path order for deterministic conflict handling.
    pub fn build(
        graphs: &'a BTreeMap<PathBuf, FileGraph>,
        analyses: &BTreeMap<PathBuf, FileAnalysis>,
    ) -> Self {
        let mut registry = Self {
            graphs,
            exports: HashMap::new(),
            exported_types: BTreeMap::new(),
            import_targets: HashMap::new(),
            diagnostics: Vec::new(),
        };

        for (path, analysis) in analyses {
            for export in &analysis.exports {
                let resolved = match &export.definition {
                    Some(def) => ResolvedSymbol::from_definition(path, def, None),
                    None if export.is_reexport => ResolvedSymbol {
                        id: SymbolId::top_level(path, &export.export_name),
                        file: path.clone(),
                        name: export.export_name.clone(),
                        kind: DefinitionKind::Import,
                        range: skein_graphs::Range::default(),
                        is_builtin: false,
                    },
                    None => continue,
                };

                registry
                    .exports
                    .insert((path.clone(), export.export_name.clone()), resolved.clone());
                if export.is_default {
                    registry
                        .exports
                        .insert((path.clone(), "default".to_string()), resolved.clone());
                }

                // Re-export clauses also act as import targets so chains hop
                // through this file.
                if export.is_reexport {
                    if let Some(source) = &export.reexport_source {
                        let target = crate::module_resolution::resolve_specifier(
                            path,
                            source,
                            analysis.language,
                            &graphs.keys().cloned().collect::<Vec<_>>(),
                        );
                        if let Some(target_file) = target {
                            registry.import_targets.insert(
                                (path.clone(), export.export_name.clone()),
                                ImportTarget {
                                    file: target_file,
                                    exported_name: export.export_name.clone(),
                                    is_namespace: false,
                                },
                            );
                        }
                    }
                }

                // Project type registry: exported classes by bare name,
                // smallest path wins.
                if resolved.kind == DefinitionKind::Class {
                    registry.register_exported_type(path, &resolved);
                }
            }

            for record in &analysis.imports {
                let Some(target_file) = &record.target_file else {
                    continue;
                };
                registry.import_targets.insert(
                    (path.clone(), record.local_name.clone()),
                    ImportTarget {
                        file: target_file.clone(),
                        exported_name: record
                            .imported_name
                            .clone()
                            .unwrap_or_else(|| record.local_name.clone()),
                        is_namespace: record.is_namespace,
                    },
                );
            }
        }

        registry
    }

    fn register_exported_type(&mut self, path: &Path, resolved: &ResolvedSymbol) {
        let info = ImportedClassInfo {
            class_name: resolved.name.clone(),
            class_def: self
                .graphs
                .get(path)
                .and_then(|g| g.find_class(&resolved.name))
                .map(|c| c.def.clone()),
            source_file: path.to_path_buf(),
        };
        match self.exported_types.get(&resolved.name) {
            None => {
                self.exported_types.insert(resolved.name.clone(), info);
            }
            Some(existing) => {
                tracing::warn!(
                    name = %resolved.name,
                    winner = %existing.source_file.display(),
                    loser = %path.display(),
                    "export name conflict"
                );
                self.diagnostics.push(Diagnostic::RegistryConflict {
                    name: resolved.name.clone(),
                    winner: existing.source_file.clone(),
                    loser: path.to_path_buf(),
                });
            }
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Follow an export through re-export hops to a terminal definition,
    /// bounded like the resolver's import following.
    pub fn export_terminal(&self, file: &Path, name: &str) -> Option<ResolvedSymbol> {
        let mut resolved = self.export(file, name)?;
        let mut depth = 0;
        while resolved.kind == DefinitionKind::Import {
            depth += 1;
            if depth > skein_graphs::resolver::MAX_IMPORT_DEPTH {
                return None;
            }
            let target = self.import_target(&resolved.file, &resolved.name)?;
            resolved = self.export(&target.file, &target.exported_name)?;
        }
        Some(resolved)
    }

    pub fn exported_type_info(&self, name: &str) -> Option<&ImportedClassInfo> {
        self.exported_types.get(name)
    }

    /// Snapshot of the type registry for storage on the project state.
    pub fn exported_types(&self) -> BTreeMap<String, ImportedClassInfo> {
        self.exported_types.clone()
    }
}

impl ProjectView for ProjectRegistry<'_> {
    fn export(&self, file: &Path, name: &str) -> Option<ResolvedSymbol> {
        self.exports
            .get(&(file.to_path_buf(), name.to_string()))
            .cloned()
    }

    fn exported_type(&self, name: &str) -> Option<ResolvedSymbol> {
        let info = self.exported_types.get(name)?;
        let def = info.class_def.as_ref()?;
        Some(ResolvedSymbol::from_definition(
            &info.source_file,
            def,
            None,
        ))
    }

    fn import_target(&self, file: &Path, local_name: &str) -> Option<ImportTarget> {
        self.import_targets
            .get(&(file.to_path_buf(), local_name.to_string()))
            .cloned()
    }

    fn file_graph(&self, file: &Path) -> Option<&FileGraph> {
        self.graphs.get(file)
    }
}
