use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level skein configuration, matching `.skein/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkeinConfig {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub languages: LanguagesSection,
    #[serde(default)]
    pub graph: GraphSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Upper bound on files analyzed concurrently in Phase 1.
    pub max_concurrent_files: usize,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            max_concurrent_files: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesSection {
    /// Language ids enabled for extraction.
    pub enabled: Vec<String>,
}

impl Default for LanguagesSection {
    fn default() -> Self {
        Self {
            enabled: vec![
                "javascript".into(),
                "typescript".into(),
                "python".into(),
                "rust".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSection {
    /// Whether non-exported definitions appear as graph nodes by default.
    pub include_private: bool,
    /// Whether test files appear in the graph by default.
    pub include_tests: bool,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            include_private: true,
            include_tests: true,
        }
    }
}

impl SkeinConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration file from disk.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.max_concurrent_files == 0 {
            return Err(ConfigError::Invalid(
                "build.max_concurrent_files must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SkeinConfig::default();
        assert_eq!(config.build.max_concurrent_files, 100);
        assert!(config.graph.include_private);
        assert_eq!(config.languages.enabled.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_document() {
        let config = SkeinConfig::from_toml_str(
            "[build]\nmax_concurrent_files = 8\n\n[graph]\ninclude_private = false\ninclude_tests = true\n",
        )
        .unwrap();
        assert_eq!(config.build.max_concurrent_files, 8);
        assert!(!config.graph.include_private);
        // Missing sections fall back to defaults.
        assert_eq!(config.languages.enabled.len(), 4);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = SkeinConfig::from_toml_str("[build]\nmax_concurrent_files = 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
