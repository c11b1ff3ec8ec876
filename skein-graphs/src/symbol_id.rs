// Stable symbol identifiers.
//
// Formats:
//   {file}#{name}           top-level definition
//   {file}#{owner}.{name}   method inside class/impl `owner`
//   {file}#<module>         synthetic caller for module-level code
//   <builtin>#{name}        language builtins and unresolved targets

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Name of the synthetic definition representing code executed at file load.
pub const MODULE_CALLER: &str = "<module>";

/// Pseudo-file used for builtins and unresolved targets.
pub const BUILTIN_FILE: &str = "<builtin>";

/// Stable, matchable identifier for a graph symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub String);

impl SymbolId {
    /// Id for a top-level definition in a file.
    pub fn top_level(file: &Path, name: &str) -> Self {
        Self(format!("{}#{name}", file.display()))
    }

    /// Id for a method owned by a class, interface, or impl target.
    pub fn method(file: &Path, owner: &str, name: &str) -> Self {
        Self(format!("{}#{owner}.{name}", file.display()))
    }

    /// Id for the synthetic module-level caller of a file.
    pub fn module(file: &Path) -> Self {
        Self(format!("{}#{MODULE_CALLER}", file.display()))
    }

    /// Id for a language builtin or an unresolved target.
    pub fn builtin(name: &str) -> Self {
        Self(format!("{BUILTIN_FILE}#{name}"))
    }

    /// The well-known unresolved target id.
    pub fn unresolved() -> Self {
        Self::builtin("unresolved")
    }

    pub fn is_builtin(&self) -> bool {
        self.0.starts_with(BUILTIN_FILE)
    }

    pub fn is_module_caller(&self) -> bool {
        self.0.ends_with(MODULE_CALLER)
    }

    /// The file portion of the id (everything before the `#`).
    pub fn file_part(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(f, _)| f)
    }

    /// The symbol portion of the id (everything after the `#`).
    pub fn symbol_part(&self) -> &str {
        self.0.split_once('#').map_or("", |(_, s)| s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SymbolId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
