//! Client façade: aggregate sync state and the operations callers use.

use crate::config::SyncConfig;
use crate::engine::{ProgressCallback, SyncEngine};
use crate::error::SyncError;
use crate::monitor::NetworkMonitor;
use chrono::{DateTime, Utc};
use hajiri_queue::QueueStore;
use hajiri_types::{
    AttendanceBatchPayload, ConflictStrategy, GradeEntryPayload, OperationPayload, SyncReport,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Aggregate sync state reported to the UI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    pub is_online: bool,
    pub is_pending: bool,
    pub pending_count: usize,
    pub is_syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
}

/// Façade over the queue store, sync engine, and network monitor.
///
/// Holds the single `is_syncing` flag that serializes sync runs; share the
/// same flag with [`spawn_auto_sync`](crate::monitor::spawn_auto_sync) so
/// manual and automatic triggers cannot overlap.
pub struct SyncClient {
    store: Arc<dyn QueueStore>,
    engine: Arc<SyncEngine>,
    monitor: Arc<NetworkMonitor>,
    config: SyncConfig,
    is_syncing: Arc<AtomicBool>,
    sync_error: Mutex<Option<String>>,
}

impl SyncClient {
    pub fn new(
        store: Arc<dyn QueueStore>,
        engine: Arc<SyncEngine>,
        monitor: Arc<NetworkMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            engine,
            monitor,
            config,
            is_syncing: Arc::new(AtomicBool::new(false)),
            sync_error: Mutex::new(None),
        }
    }

    /// The in-flight flag, for sharing with the auto-sync task.
    pub fn sync_flag(&self) -> Arc<AtomicBool> {
        self.is_syncing.clone()
    }

    /// Queues one attendance batch recorded in a single offline session.
    pub fn enqueue_attendance(&self, payload: AttendanceBatchPayload) -> Result<String, SyncError> {
        let id = self
            .store
            .append(OperationPayload::AttendanceBatch(payload))?;
        Ok(id)
    }

    /// Queues one student's grade for one exam.
    pub fn enqueue_grade(&self, payload: GradeEntryPayload) -> Result<String, SyncError> {
        let id = self.store.append(OperationPayload::GradeEntry(payload))?;
        Ok(id)
    }

    /// Manually triggers a sync run.
    ///
    /// Rejects synchronously while offline and while another run is in
    /// flight, rather than returning an empty report.
    pub async fn trigger_sync(
        &self,
        strategy: ConflictStrategy,
        progress: Option<ProgressCallback>,
    ) -> Result<SyncReport, SyncError> {
        if !self.monitor.is_online() {
            return Err(SyncError::Offline);
        }
        if self
            .is_syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::SyncInProgress);
        }

        *self.sync_error.lock().unwrap() = None;
        info!("manual sync triggered");

        let report = self.engine.run(strategy, progress).await;

        *self.sync_error.lock().unwrap() = if report.failed_count > 0 {
            Some(format!(
                "{} operation(s) failed to sync",
                report.failed_count
            ))
        } else {
            // Auto-resolved conflicts are informational; conflict_count in
            // the report stays available for the UI to surface separately.
            None
        };
        self.is_syncing.store(false, Ordering::Release);

        Ok(report)
    }

    /// Recomputes the aggregate state from the store and monitor.
    pub fn refresh_status(&self) -> Result<ClientStatus, SyncError> {
        let pending_count = self.store.count(None)?;
        Ok(ClientStatus {
            is_online: self.monitor.is_online(),
            is_pending: pending_count > 0,
            pending_count,
            is_syncing: self.is_syncing.load(Ordering::Acquire),
            last_sync_time: self.store.last_sync_time()?,
            sync_error: self.sync_error.lock().unwrap().clone(),
        })
    }

    /// Removes synced records older than the configured retention window.
    pub fn cleanup_synced(&self) -> Result<usize, SyncError> {
        Ok(self.store.cleanup(self.config.cleanup_max_age_days)?)
    }
}
