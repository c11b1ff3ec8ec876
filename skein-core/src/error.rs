/// Top-level skein error type.
#[derive(thiserror::Error, Debug)]
pub enum SkeinError {
    #[error("Graph engine error: {0}")]
    Graph(#[from] skein_graphs::GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The build was rejected because a file's language is unknown.
    #[error("Unknown language for {0}")]
    UnknownLanguage(String),

    /// Every input file failed to parse; there is nothing to build.
    #[error("All {0} input files failed to parse")]
    AllFilesFailed(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SkeinError>;
