use thiserror::Error;

/// Top-level error type for the control service.
///
/// Subsystem crates define their own error types; the variants here cover
/// the concerns shared by every crate (configuration, I/O, serialization).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgriError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),
}

impl From<toml::de::Error> for AgriError {
    fn from(err: toml::de::Error) -> Self {
        AgriError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AgriError {
    fn from(err: toml::ser::Error) -> Self {
        AgriError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AgriError {
    fn from(err: serde_json::Error) -> Self {
        AgriError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for control-service operations.
pub type Result<T> = std::result::Result<T, AgriError>;
