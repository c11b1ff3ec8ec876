pub mod ecma;
mod helpers;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::capture::{CaptureConfig, RawCapture};
use crate::{GraphError, Language, Result};

/// Trait implemented by each language's capture support.
pub trait LanguageSupport: Send + Sync + std::fmt::Debug {
    /// Language identifier (e.g., "rust", "python").
    fn id(&self) -> &'static str;

    /// The language this support handles.
    fn language(&self) -> Language;

    /// File extensions this language handles.
    fn extensions(&self) -> &'static [&'static str];

    /// Tree-sitter grammar for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// The capture-name → (category, entity, extractors) mapping table.
    fn capture_config(&self) -> &CaptureConfig;

    /// Walk the syntax tree and emit raw captures. Stands in for an external
    /// query engine; the names emitted here must appear in `capture_config`.
    fn collect_captures<'t>(&self, tree: &'t tree_sitter::Tree, source: &str)
    -> Vec<RawCapture<'t>>;
}

/// Parse a source string with a language's grammar.
pub fn parse_source(
    support: &dyn LanguageSupport,
    source: &str,
    path: &Path,
) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&support.tree_sitter_language())
        .map_err(|e| GraphError::TreeSitter(e.to_string()))?;
    parser.parse(source, None).ok_or_else(|| GraphError::Parse {
        path: path.display().to_string(),
        message: "tree-sitter returned no tree".to_string(),
    })
}

/// Registry of all supported languages.
#[derive(Debug)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn LanguageSupport>>,
    extension_map: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        reg.register(Arc::new(javascript::JavaScriptSupport));
        reg.register(Arc::new(typescript::TypeScriptSupport));
        reg.register(Arc::new(python::PythonSupport));
        reg.register(Arc::new(rust::RustSupport));
        reg
    }

    fn register(&mut self, lang: Arc<dyn LanguageSupport>) {
        for ext in lang.extensions() {
            self.extension_map
                .insert((*ext).to_string(), lang.id().to_string());
        }
        self.languages.insert(lang.id().to_string(), lang);
    }

    /// Look up the language support for a file by its extension.
    pub fn for_file(&self, path: &Path) -> Option<Arc<dyn LanguageSupport>> {
        let ext = path.extension()?.to_str()?;
        let lang_id = self.extension_map.get(ext)?;
        self.languages.get(lang_id).cloned()
    }

    /// Get a language by its identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn LanguageSupport>> {
        self.languages.get(id).cloned()
    }

    /// List all registered language IDs.
    pub fn language_ids(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
