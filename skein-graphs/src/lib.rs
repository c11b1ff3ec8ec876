//! Per-file graph extraction for JavaScript, TypeScript, Python, and Rust.
//!
//! Walks tree-sitter syntax trees into raw captures, normalizes them into a
//! uniform shape, and folds them into a [`FileGraph`]: a scope tree, structured
//! symbol definitions, typed symbol references, and lightweight intra-file type
//! tracking. Cross-file assembly lives in `skein-core`.

pub mod capture;
pub mod definitions;
pub mod extract;
pub mod languages;
pub mod references;
pub mod resolver;
pub mod scope;
pub mod symbol_id;
pub mod type_tracking;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use extract::FileGraph;
pub use languages::{LanguageRegistry, LanguageSupport};
pub use symbol_id::SymbolId;

/// Error type for the extraction engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Source file could not be parsed by tree-sitter.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path of the file that failed to parse.
        path: String,
        /// Description of the parse failure.
        message: String,
    },

    /// The file's language is not supported by the extraction engine.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Internal tree-sitter error (grammar loading, node access, etc.).
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

/// Convenience alias for `Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;

// ── Diagnostics ────────────────────────────────────────────────────

/// Non-fatal conditions surfaced on build results instead of being thrown.
///
/// Only [`GraphError::UnsupportedLanguage`] (or every file failing to parse)
/// aborts a build; everything else degrades to one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A file was skipped because tree-sitter could not parse it.
    #[error("Parse failure in {file}: {message}")]
    ParseFailure { file: PathBuf, message: String },

    /// A file had no registered language support.
    #[error("Unknown language for {file}")]
    UnknownLanguage { file: PathBuf },

    /// An import chain exceeded the depth bound or revisited itself.
    #[error("Resolver cycle while following `{name}` from {file}")]
    ResolverCycle { file: PathBuf, name: String },

    /// Two candidate parents contained an orphan at equal area.
    #[error("Ambiguous parent for orphan `{name}` in {file} at row {row}")]
    OrphanAttachmentAmbiguous {
        file: PathBuf,
        name: String,
        row: usize,
    },

    /// Two files exported the same name; the smaller path won.
    #[error("Export `{name}` from {loser} shadowed by {winner}")]
    RegistryConflict {
        name: String,
        winner: PathBuf,
        loser: PathBuf,
    },
}

// ── Source positions ───────────────────────────────────────────────

/// Zero-based row/column position within a source file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<tree_sitter::Point> for Position {
    fn from(p: tree_sitter::Point) -> Self {
        Self {
            row: p.row,
            column: p.column,
        }
    }
}

/// Inclusive start/end span within a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether a position falls within this range (both endpoints inclusive).
    pub fn contains(&self, pos: Position) -> bool {
        (self.start.row < pos.row || (self.start.row == pos.row && self.start.column <= pos.column))
            && (self.end.row > pos.row || (self.end.row == pos.row && self.end.column >= pos.column))
    }

    /// Whether another range lies entirely within this one.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// Whether another range lies within this one without sharing both endpoints.
    pub fn strictly_contains(&self, other: &Range) -> bool {
        self.contains_range(other) && self != other
    }

    /// Rectangular area used for smallest-enclosing-scope tie-breaks.
    /// Saturates so the root scope's effectively-infinite range stays the
    /// largest value rather than overflowing.
    pub fn area(&self) -> usize {
        let rows = self.end.row.saturating_sub(self.start.row).saturating_add(1);
        let cols = self
            .end
            .column
            .saturating_sub(self.start.column)
            .saturating_add(1);
        rows.saturating_mul(cols)
    }
}

impl From<tree_sitter::Range> for Range {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start: r.start_point.into(),
            end: r.end_point.into(),
        }
    }
}

/// A range pinned to a file, optionally distinguishing the identifier span
/// from the full construct body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: PathBuf,
    /// Span of the identifier itself.
    pub range: Range,
    /// Span of the full construct (class/function body), when known.
    pub enclosing_range: Option<Range>,
}

impl Location {
    pub fn new(file_path: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            file_path: file_path.into(),
            range,
            enclosing_range: None,
        }
    }

    pub fn with_enclosing(mut self, enclosing: Range) -> Self {
        self.enclosing_range = Some(enclosing);
        self
    }
}

// ── Symbol classification ──────────────────────────────────────────

/// Classification of a symbol definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Class,
    Interface,
    Enum,
    Function,
    Method,
    Constructor,
    Property,
    Field,
    Variable,
    Constant,
    Parameter,
    Import,
    TypeAlias,
    Namespace,
    Decorator,
    Module,
}

impl DefinitionKind {
    /// Kinds that can appear as call targets in the final graph.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            Self::Function | Self::Method | Self::Constructor | Self::Class
        )
    }

    /// Kinds that own an enclosing scope of their own.
    pub fn is_scope_owner(self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Interface
                | Self::Enum
                | Self::Function
                | Self::Method
                | Self::Constructor
                | Self::Namespace
                | Self::Module
        )
    }
}

/// How widely a definition is visible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Visible only within its own file.
    FilePrivate,
    /// Exported from its file under a (possibly renamed) name.
    FileExport {
        name: String,
        is_default: bool,
        is_reexport: bool,
    },
    /// Language-visible wider than the file (e.g. `pub` items).
    Public,
}

// ── Languages ──────────────────────────────────────────────────────

/// The languages the extraction engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
}

impl Language {
    /// Language identifier string (`"javascript"`, `"typescript"`, …).
    pub fn id(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Rust => "rust",
        }
    }

    /// Detect a language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            "py" | "pyi" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    /// Detect a language from a file path.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
