//! Error types for the knowledge base layer.

use trove_core::error::TroveError;

/// Errors raised while talking to the document store.
///
/// Unknown object types and missing documents are not errors; they surface
/// as empty result lists or `None`.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("query against '{index}' failed with status {status}: {reason}")]
    QueryFailed {
        index: String,
        status: u16,
        reason: String,
    },
    #[error("malformed store response: {0}")]
    MalformedResponse(String),
    #[error("invalid seed data: {0}")]
    Seed(String),
}

impl From<KbError> for TroveError {
    fn from(err: KbError) -> Self {
        TroveError::Store(err.to_string())
    }
}
