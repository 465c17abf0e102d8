//! Error types for turn resolution.

use trove_kb::KbError;

/// Errors from resolving a conversational turn.
///
/// None of these reach the user verbatim; the resolver turns them into an
/// apology utterance.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("knowledge base error: {0}")]
    Store(#[from] KbError),
    #[error("invalid tracker: {0}")]
    InvalidTracker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::InvalidTracker("slots must be an object".to_string());
        assert_eq!(err.to_string(), "invalid tracker: slots must be an object");
    }

    #[test]
    fn test_chat_error_from_kb_error() {
        let err: ChatError = KbError::StoreUnavailable("timed out".to_string()).into();
        assert!(matches!(err, ChatError::Store(KbError::StoreUnavailable(_))));
        assert_eq!(
            err.to_string(),
            "knowledge base error: store unavailable: timed out"
        );
    }
}
