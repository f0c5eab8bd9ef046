//! Sync error types.

use thiserror::Error;

/// Errors that can occur while reconciling the offline queue.
///
/// Item-level submission failures never surface through this type from a
/// sync run; they aggregate into the run's `SyncReport`. These variants
/// cover infrastructure conditions and the façade's synchronous rejections.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot sync while offline")]
    Offline,

    #[error("a sync run is already in progress")]
    SyncInProgress,

    #[error("queue storage error: {0}")]
    Storage(#[from] hajiri_queue::StorageError),

    #[error("request gate cleared before execution")]
    GateCleared,

    #[error("server rejected request: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
