//! Error types for transcript persistence.

use thiserror::Error;

/// Failures reading or writing the transcript file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias for store internals.
pub type StoreResult<T> = Result<T, StoreError>;
