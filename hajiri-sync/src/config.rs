//! Sync engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the sync engine and its collaborators.
///
/// The retry ceiling and the gate ceilings are configurable defaults, not
/// hardwired constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL for the school management API.
    pub api_base_url: String,

    /// Optional bearer token attached to every request.
    pub api_token: Option<String>,

    /// An operation at or above this many failed attempts is never
    /// resubmitted automatically.
    pub max_retry_count: u32,

    /// Concurrency ceiling of the request gate in normal mode.
    pub max_concurrent_requests: usize,

    /// Reduced ceiling applied while lite (low-bandwidth) mode is on.
    pub lite_max_concurrent_requests: usize,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Synced records older than this many days are removed by cleanup.
    pub cleanup_max_age_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.hajiri.app".to_string(),
            api_token: None,
            max_retry_count: 3,
            max_concurrent_requests: 6,
            lite_max_concurrent_requests: 2,
            request_timeout_secs: 30,
            cleanup_max_age_days: 30,
        }
    }
}
