//! Error types for agent-recall.
//!
//! This module defines the central error type [`RecallError`] shared by the
//! fusion engine, the backing-store adapter, and the retrieval coordinator,
//! along with the [`RecallResult<T>`] type alias.

use thiserror::Error;

/// Top-level error type for agent-recall operations.
///
/// Every failure mode is a value at the public boundary; no operation panics
/// on malformed backend data.
#[derive(Debug, Error)]
pub enum RecallError {
    /// A fusion weight is outside the `[0, 1]` range.
    #[error("weight must be between 0 and 1")]
    InvalidWeight,

    /// The decay half-life is zero, negative, or not a number.
    #[error("half-life must be positive")]
    InvalidHalfLife,

    /// The minimum decay multiplier is outside the `[0, 1]` range.
    #[error("minimum weight must be between 0 and 1")]
    InvalidMinWeight,

    /// The Reciprocal Rank Fusion constant is zero.
    #[error("RRF constant k must be positive")]
    InvalidRrfK,

    /// A search completed but yielded no results.
    ///
    /// Soft: callers that prefer an empty list should not treat this as
    /// fatal.
    #[error("no results found")]
    NoResults,

    /// The backing store does not know the requested collection.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// The backing store rejected the query vector.
    ///
    /// Typically the query vector length does not match the dimension the
    /// collection was created with.
    #[error("vector dimension mismatch: {0}")]
    VectorDimensionMismatch(String),

    /// Network failure, request timeout, or a non-2xx HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend response could not be decoded into typed results.
    ///
    /// `path` names the key or path segment at which narrowing failed.
    #[error("parse error at {path}: {message}")]
    Parse {
        /// Response path segment that failed to narrow
        path: String,
        /// Description of the decoding failure
        message: String,
    },

    /// The GraphQL response carried a non-empty `errors` array.
    #[error("backend error: {0}")]
    Backend(String),

    /// Configuration could not be loaded or is structurally invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation attempted after [`close`](crate::store::VectorSearchStore::close).
    ///
    /// Sticky: once a retriever has been closed this is the only outcome for
    /// operational calls.
    #[error("retriever is closed")]
    Closed,

    /// The caller's deadline or cancellation fired before both sub-searches
    /// completed. Partial results are discarded.
    #[error("operation cancelled")]
    Cancelled,

    /// Both sides of a hybrid search failed.
    ///
    /// Only produced by the hybrid path; a single-source failure there is
    /// tolerated by substituting an empty result set instead.
    #[error("both searches failed: static={static_error}, conversation={conversation_error}")]
    BothSearchesFailed {
        /// Failure from the knowledge-base side
        static_error: Box<RecallError>,
        /// Failure from the conversation-memory side
        conversation_error: Box<RecallError>,
    },
}

impl RecallError {
    /// Helper for parse failures, keeping the failing path close to the message.
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        RecallError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for RecallError {
    fn from(err: config::ConfigError) -> Self {
        RecallError::Config(err.to_string())
    }
}

/// Result type alias for agent-recall operations.
pub type RecallResult<T> = Result<T, RecallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RecallError::Closed.to_string(), "retriever is closed");
        assert_eq!(
            RecallError::InvalidWeight.to_string(),
            "weight must be between 0 and 1"
        );
    }

    #[test]
    fn test_composite_error_names_both_sides() {
        let err = RecallError::BothSearchesFailed {
            static_error: Box::new(RecallError::Transport("connection refused".into())),
            conversation_error: Box::new(RecallError::IndexNotFound("Conversation".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("index not found: Conversation"));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = RecallError::parse("_additional.id", "missing key");
        assert_eq!(err.to_string(), "parse error at _additional.id: missing key");
    }
}
