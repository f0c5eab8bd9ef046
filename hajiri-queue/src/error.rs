//! Queue storage error types.

use thiserror::Error;

/// Result type for queue storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in the durable queue store.
///
/// Losing the ability to queue must never fail silently: every storage
/// failure surfaces as a distinguishable error rather than a dropped write.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("queue storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("operation not found: {0}")]
    NotFound(String),

    #[error("corrupt queue record {id}: {detail}")]
    Corrupt { id: String, detail: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
