//! Offline-to-server reconciliation for the Hajiri client.
//!
//! A teacher working in a low-connectivity region keeps recording
//! attendance and grades offline; this crate reconciles the locally queued
//! writes with the school management server once connectivity returns,
//! without data loss, duplication, or silent overwrite.
//!
//! Pieces:
//! - [`SyncEngine`]: drains the queue, submits operations, classifies
//!   outcomes, applies the conflict strategy, streams progress.
//! - [`RequestGate`]: FIFO admission gate capping in-flight requests,
//!   with a reduced ceiling in lite mode.
//! - [`NetworkMonitor`] / [`spawn_auto_sync`]: connectivity transitions
//!   and the deduplicated automatic trigger.
//! - [`SyncClient`]: aggregate state façade for callers and the UI.

pub mod api_client;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod monitor;

pub use api_client::{SubmitOutcome, SyncApiClient};
pub use client::{ClientStatus, SyncClient};
pub use config::SyncConfig;
pub use engine::{ProgressCallback, SyncEngine};
pub use error::SyncError;
pub use gate::{GateStatus, RequestGate};
pub use monitor::{spawn_auto_sync, AutoSyncHandle, NetworkMonitor};
