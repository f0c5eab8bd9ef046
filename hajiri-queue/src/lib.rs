//! Durable queue storage for offline-originated operations.
//!
//! Queued attendance batches and grade entries are persisted in SQLite so
//! they survive app restarts on a device that may stay offline for days.
//! The store is injected behind the [`QueueStore`] trait; tests substitute
//! an in-memory database, production opens a per-origin file.

mod error;
mod store;

pub use error::{StorageError, StorageResult};
pub use store::{QueueStore, SqliteQueueStore};
