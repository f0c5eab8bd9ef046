//! The sync engine: drains the offline queue against the server.
//!
//! One run snapshots the eligible operations, submits them kind by kind in
//! FIFO order, classifies every outcome (accepted / conflict / failure),
//! applies the run's conflict strategy, and aggregates everything into a
//! `SyncReport`. Item-level failures never escape `run`; they are recorded
//! and the run moves on.

use crate::api_client::{SubmitOutcome, SyncApiClient};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::gate::RequestGate;
use chrono::Utc;
use hajiri_queue::QueueStore;
use hajiri_types::{
    ConflictResolution, ConflictStrategy, OperationKind, OperationPayload, QueuedOperation,
    SyncConflict, SyncItemError, SyncProgress, SyncReport, SyncStage,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Observer invoked at stage transitions and around each kind's batch.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

const MAX_RETRY_MESSAGE: &str = "Max retry count exceeded";

/// Reconciles locally queued operations against the remote authority.
pub struct SyncEngine {
    store: Arc<dyn QueueStore>,
    api: Arc<SyncApiClient>,
    gate: Arc<RequestGate>,
    online_rx: watch::Receiver<bool>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        api: Arc<SyncApiClient>,
        gate: Arc<RequestGate>,
        online_rx: watch::Receiver<bool>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            api,
            gate,
            online_rx,
            config,
        }
    }

    fn is_online(&self) -> bool {
        *self.online_rx.borrow()
    }

    /// Runs one sync pass over the current queue snapshot.
    ///
    /// If connectivity is down the run returns immediately with a single
    /// run-level error: no network I/O, no queue mutation. Once started, a
    /// run completes over its snapshot; there is no mid-run cancellation.
    pub async fn run(
        &self,
        strategy: ConflictStrategy,
        progress: Option<ProgressCallback>,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        if !self.is_online() {
            debug!("sync requested while offline, returning without network I/O");
            report.errors.push(SyncItemError::run_level("device is offline"));
            return report;
        }

        // Snapshot every kind up front so a read failure aborts the run
        // before any mutation.
        let mut batches: Vec<(OperationKind, Vec<QueuedOperation>)> = Vec::new();
        for kind in OperationKind::ALL {
            match self.store.list_pending(Some(kind)) {
                Ok(ops) => batches.push((kind, ops)),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "queue read failed, aborting run");
                    report
                        .errors
                        .push(SyncItemError::run_level(format!("queue read failed: {e}")));
                    return report;
                }
            }
        }

        let total: usize = batches.iter().map(|(_, ops)| ops.len()).sum();
        info!(total, strategy = ?strategy, "sync run started");
        emit(&progress, SyncStage::Starting, 0, total, "Starting sync");

        let mut current = 0;
        for (kind, ops) in batches {
            emit(
                &progress,
                SyncStage::Syncing(kind),
                current,
                total,
                format!("Syncing {} {kind} operation(s)", ops.len()),
            );

            // Sequential within a kind: each item's outcome is awaited before
            // the next starts, preserving FIFO and keeping conflict handling
            // on one entity at a time.
            for op in ops {
                self.sync_one(op, strategy, &mut report, &progress, current, total)
                    .await;
                current += 1;
            }

            emit(
                &progress,
                SyncStage::Syncing(kind),
                current,
                total,
                format!("Finished {kind} batch"),
            );
        }

        // Stamped only when the run actually contacted the network, whatever
        // the item outcomes. An empty snapshot makes no calls.
        if total > 0 {
            if let Err(e) = self.store.set_last_sync_time(Utc::now()) {
                warn!(error = %e, "failed to persist last sync time");
            }
        }

        report.success = report.failed_count == 0 && report.conflict_count == 0;

        if report.success {
            match self.store.cleanup(self.config.cleanup_max_age_days) {
                Ok(deleted) if deleted > 0 => debug!(deleted, "retention cleanup after sync"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "retention cleanup failed"),
            }
        }

        info!(
            synced = report.synced_count,
            failed = report.failed_count,
            conflicts = report.conflict_count,
            success = report.success,
            "sync run finished"
        );
        emit(
            &progress,
            SyncStage::Complete,
            current,
            total,
            format!(
                "Synced {}, failed {}, conflicts {}",
                report.synced_count, report.failed_count, report.conflict_count
            ),
        );

        report
    }

    async fn sync_one(
        &self,
        op: QueuedOperation,
        strategy: ConflictStrategy,
        report: &mut SyncReport,
        progress: &Option<ProgressCallback>,
        current: usize,
        total: usize,
    ) {
        // At the ceiling: classified failed on encounter, no network call,
        // no further increment. The record stays in the store for visibility.
        if op.retry_count >= self.config.max_retry_count {
            debug!(id = %op.id, retries = op.retry_count, "retry ceiling reached, skipping");
            report.failed_count += 1;
            report.errors.push(SyncItemError {
                id: op.id,
                kind: Some(op.kind),
                message: MAX_RETRY_MESSAGE.to_string(),
            });
            return;
        }

        let outcome = self.gate.enqueue(|| self.submit(&op, false)).await;

        match outcome {
            Ok(SubmitOutcome::Accepted) => self.record_synced(&op, report),
            Ok(SubmitOutcome::Conflict { server_data }) => {
                emit(
                    progress,
                    SyncStage::ResolvingConflicts,
                    current,
                    total,
                    format!("Resolving conflict for {}", op.id),
                );
                self.resolve_conflict(op, server_data, strategy, report).await;
            }
            Err(e) => self.record_failure(&op, e.to_string(), report),
        }
    }

    /// Applies the run's conflict strategy to one diverged operation.
    ///
    /// Resolution is an explicit second path after a conflicted submit,
    /// optionally resubmitting with the force flag. The forced resubmit
    /// carries the entire original payload (whole-record last-write-wins).
    async fn resolve_conflict(
        &self,
        op: QueuedOperation,
        server_data: serde_json::Value,
        strategy: ConflictStrategy,
        report: &mut SyncReport,
    ) {
        let local_data = serde_json::to_value(&op.payload).unwrap_or_default();

        match strategy {
            ConflictStrategy::LastWriteWins => {
                match self.gate.enqueue(|| self.submit(&op, true)).await {
                    Ok(SubmitOutcome::Accepted) => {
                        self.record_synced(&op, report);
                        report.conflict_count += 1;
                        report.conflicts.push(SyncConflict {
                            id: op.id.clone(),
                            kind: op.kind,
                            local_data,
                            server_data,
                            resolution: ConflictResolution::Local,
                        });
                    }
                    Ok(SubmitOutcome::Conflict { .. }) => {
                        // The force flag should have overridden; surfacing as
                        // a failure lets the next run retry it.
                        self.record_failure(
                            &op,
                            "conflict persisted after forced resubmit".to_string(),
                            report,
                        );
                    }
                    Err(e) => self.record_failure(&op, e.to_string(), report),
                }
            }
            ConflictStrategy::ServerWins => {
                debug!(id = %op.id, "accepting server state, discarding local edit");
                self.record_synced(&op, report);
                report.conflict_count += 1;
                report.conflicts.push(SyncConflict {
                    id: op.id.clone(),
                    kind: op.kind,
                    local_data,
                    server_data,
                    resolution: ConflictResolution::Server,
                });
            }
            ConflictStrategy::PromptUser => {
                // Neither resubmitted nor marked synced: the operation stays
                // pending and resurfaces on future runs until resolved
                // out-of-band.
                debug!(id = %op.id, "conflict left pending for user resolution");
                report.conflict_count += 1;
                report.conflicts.push(SyncConflict {
                    id: op.id.clone(),
                    kind: op.kind,
                    local_data,
                    server_data,
                    resolution: ConflictResolution::Pending,
                });
            }
        }
    }

    async fn submit(&self, op: &QueuedOperation, force: bool) -> Result<SubmitOutcome, SyncError> {
        match &op.payload {
            OperationPayload::AttendanceBatch(payload) => {
                self.api.submit_attendance_batch(payload, force).await
            }
            OperationPayload::GradeEntry(payload) => {
                self.api.submit_grade_entry(payload, force).await
            }
        }
    }

    fn record_synced(&self, op: &QueuedOperation, report: &mut SyncReport) {
        match self.store.mark_synced(&op.id) {
            Ok(()) => {
                debug!(id = %op.id, kind = %op.kind, "operation synced");
                report.synced_count += 1;
            }
            Err(e) => {
                // The server accepted but the local record could not be
                // updated; report it so the divergence is visible.
                warn!(id = %op.id, error = %e, "failed to mark operation synced");
                report.failed_count += 1;
                report.errors.push(SyncItemError {
                    id: op.id.clone(),
                    kind: Some(op.kind),
                    message: format!("accepted by server but not marked synced: {e}"),
                });
            }
        }
    }

    fn record_failure(&self, op: &QueuedOperation, message: String, report: &mut SyncReport) {
        warn!(id = %op.id, kind = %op.kind, error = %message, "operation failed to sync");
        if let Err(e) = self.store.mark_error(&op.id, &message) {
            warn!(id = %op.id, error = %e, "failed to record sync error");
        }
        report.failed_count += 1;
        report.errors.push(SyncItemError {
            id: op.id.clone(),
            kind: Some(op.kind),
            message,
        });
    }
}

fn emit(
    progress: &Option<ProgressCallback>,
    stage: SyncStage,
    current: usize,
    total: usize,
    message: impl Into<String>,
) {
    if let Some(callback) = progress {
        callback(SyncProgress {
            stage,
            current,
            total,
            message: message.into(),
        });
    }
}
