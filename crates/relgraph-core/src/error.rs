use thiserror::Error;

/// Top-level error type for relgraph.
#[derive(Error, Debug)]
pub enum RelgraphError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for RelgraphError {
    fn from(e: config::ConfigError) -> Self {
        RelgraphError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelgraphError>;
