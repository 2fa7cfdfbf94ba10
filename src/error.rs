//! Error types for Lotus.
//!
//! Most malformed input is absorbed by the index as a no-op, so the variants
//! here cover configuration problems, registry misuse, collaborator failures
//! raised by user-supplied encoders or tokenizers, and worker shutdowns.

use thiserror::Error;

/// The main error type for Lotus operations.
#[derive(Error, Debug)]
pub enum LotusError {
    /// An argument had the wrong shape (bad pattern, duplicate name, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Index configuration could not be resolved.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A named entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Text analysis failed inside an encoder or tokenizer.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// A shard worker could not be reached.
    #[error("Worker error: {0}")]
    Worker(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else, typically raised by a custom collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`LotusError`].
pub type Result<T> = std::result::Result<T, LotusError>;

impl LotusError {
    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        LotusError::InvalidArgument(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        LotusError::InvalidConfig(msg.into())
    }

    /// Create a not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        LotusError::NotFound(msg.into())
    }

    /// Create an analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        LotusError::Analysis(msg.into())
    }

    /// Create a worker error.
    pub fn worker<S: Into<String>>(msg: S) -> Self {
        LotusError::Worker(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LotusError::invalid_argument("duplicate encoder 'x'");
        assert_eq!(err.to_string(), "Invalid argument: duplicate encoder 'x'");

        let err = LotusError::not_found("language 'de'");
        assert_eq!(err.to_string(), "Not found: language 'de'");
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: LotusError = anyhow::anyhow!("tokenizer exploded").into();
        assert!(matches!(err, LotusError::Other(_)));
        assert_eq!(err.to_string(), "tokenizer exploded");
    }
}
