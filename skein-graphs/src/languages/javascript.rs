use std::sync::LazyLock;

use crate::capture::{CaptureConfig, RawCapture};
use crate::Language;

use super::{LanguageSupport, ecma};

static CONFIG: LazyLock<CaptureConfig> =
    LazyLock::new(|| CaptureConfig::new(ecma::base_entries()));

#[derive(Debug)]
pub struct JavaScriptSupport;

impl LanguageSupport for JavaScriptSupport {
    fn id(&self) -> &'static str {
        "javascript"
    }

    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn capture_config(&self) -> &CaptureConfig {
        &CONFIG
    }

    fn collect_captures<'t>(
        &self,
        tree: &'t tree_sitter::Tree,
        source: &str,
    ) -> Vec<RawCapture<'t>> {
        ecma::collect_captures(tree, source)
    }
}
