use thiserror::Error;

/// Top-level error type for the Trove system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for TroveError` so that the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TroveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for TroveError {
    fn from(err: toml::de::Error) -> Self {
        TroveError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TroveError {
    fn from(err: serde_json::Error) -> Self {
        TroveError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Trove operations.
pub type Result<T> = std::result::Result<T, TroveError>;
