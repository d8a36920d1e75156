//! Error types for memoboard.

use thiserror::Error;

/// Result type alias using memoboard's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for memoboard operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Persisted key-value store read/write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Remote collaborator (document store, query service) failed
    #[error("Remote error: {0}")]
    Remote(String),

    /// Create was blocked because identical content was submitted moments ago
    #[error("Duplicate submission of {original_id}")]
    DuplicateSubmission { original_id: String },

    /// Queue item exhausted its retries and needs a manual retry or discard
    #[error("Operation {item_id} failed permanently: {message}")]
    PermanentFailure { item_id: String, message: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must be surfaced to the user rather than absorbed.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Error::DuplicateSubmission { .. } | Error::PermanentFailure { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
