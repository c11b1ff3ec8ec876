// Lightweight intra-file type tracking.
//
// A flat last-write-wins record of "at position P, variable V is of class C".
// Not a type system: no narrowing, no unions, no flow sensitivity. Local
// trackers cover one function body; the file tracker covers module-level
// assignments plus imported-class bindings, which are file-scoped.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::definitions::SymbolDefinition;
use crate::Position;

/// What is known about a variable's class at a given position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub class_name: String,
    /// The resolved class definition, when one was found.
    pub class_def: Option<SymbolDefinition>,
    pub declaration_position: Position,
}

/// A class binding imported from another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedClassInfo {
    pub class_name: String,
    pub class_def: Option<SymbolDefinition>,
    pub source_file: PathBuf,
}

/// Whether a discovery binds in the local function body or at file level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryScope {
    Local,
    File,
}

/// A constructor-call assignment observed during per-file analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDiscovery {
    pub variable: String,
    pub type_info: TypeInfo,
    pub scope: DiscoveryScope,
}

/// Variable → type bindings for one function body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTypeTracker {
    bindings: HashMap<String, TypeInfo>,
}

impl LocalTypeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding. A second assignment overwrites the first.
    pub fn assign(&mut self, variable: impl Into<String>, info: TypeInfo) {
        self.bindings.insert(variable.into(), info);
    }

    pub fn get(&self, variable: &str) -> Option<&TypeInfo> {
        self.bindings.get(variable)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// Module-level variable bindings, imported classes, and export names for one
/// file. Built during Phase 1, frozen into the project snapshot afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeTracker {
    bindings: HashMap<String, TypeInfo>,
    imported_classes: HashMap<String, ImportedClassInfo>,
    exported_names: Vec<String>,
}

impl FileTypeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, variable: impl Into<String>, info: TypeInfo) {
        self.bindings.insert(variable.into(), info);
    }

    pub fn get(&self, variable: &str) -> Option<&TypeInfo> {
        self.bindings.get(variable)
    }

    /// Register an imported class under its local binding name.
    pub fn add_imported_class(&mut self, local_name: impl Into<String>, info: ImportedClassInfo) {
        self.imported_classes.insert(local_name.into(), info);
    }

    pub fn imported_class(&self, local_name: &str) -> Option<&ImportedClassInfo> {
        self.imported_classes.get(local_name)
    }

    /// Imported class by its original class name, for aliased bindings.
    pub fn imported_class_by_name(&self, class_name: &str) -> Option<&ImportedClassInfo> {
        self.imported_classes
            .get(class_name)
            .or_else(|| {
                let mut matches: Vec<&ImportedClassInfo> = self
                    .imported_classes
                    .values()
                    .filter(|i| i.class_name == class_name)
                    .collect();
                matches.sort_by(|a, b| a.source_file.cmp(&b.source_file));
                matches.into_iter().next()
            })
    }

    pub fn imported_classes(&self) -> impl Iterator<Item = (&String, &ImportedClassInfo)> {
        self.imported_classes.iter()
    }

    pub fn record_export(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.exported_names.contains(&name) {
            self.exported_names.push(name);
        }
    }

    pub fn exported_names(&self) -> &[String] {
        &self.exported_names
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.exported_names.iter().any(|n| n == name)
    }

    /// Fold a discovery into the right tracker: file-scope discoveries land
    /// here, local ones in the given local tracker.
    pub fn apply_discovery(&mut self, local: &mut LocalTypeTracker, discovery: TypeDiscovery) {
        match discovery.scope {
            DiscoveryScope::File => self.assign(discovery.variable, discovery.type_info),
            DiscoveryScope::Local => local.assign(discovery.variable, discovery.type_info),
        }
    }
}

/// Look up a variable's type: local bindings shadow file-level ones, and
/// imported classes answer for names with no value binding.
pub fn lookup_type<'a>(
    local: &'a LocalTypeTracker,
    file: &'a FileTypeTracker,
    variable: &str,
) -> Option<&'a TypeInfo> {
    local.get(variable).or_else(|| file.get(variable))
}
