//! Per-run sync outcomes: reports, conflicts, and streamed progress.

use crate::operation::OperationKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy applied to every conflict encountered in a single sync run.
///
/// The default is last-write-wins: the dominant real cause of conflicts is
/// two staff editing overlapping records before either synced, and losing
/// at most one edit beats blocking an entire class's records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    #[default]
    LastWriteWins,
    ServerWins,
    PromptUser,
}

/// How a single conflict was resolved within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Local payload was force-resubmitted and accepted.
    Local,
    /// Server state was accepted; the local edit is discarded.
    Server,
    /// Left for out-of-band resolution; the operation stays pending.
    Pending,
}

/// One failure recorded during a run. Item-level failures carry the
/// operation's id and kind; run-level infrastructure failures (offline at
/// start, unreadable queue) carry neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItemError {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<OperationKind>,
    pub message: String,
}

impl SyncItemError {
    /// A run-level failure not tied to any queued operation.
    pub fn run_level(message: impl Into<String>) -> Self {
        Self {
            id: "sync".to_string(),
            kind: None,
            message: message.into(),
        }
    }
}

/// One conflict encountered during a run, with both sides of the divergence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub id: String,
    pub kind: OperationKind,
    pub local_data: serde_json::Value,
    pub server_data: serde_json::Value,
    pub resolution: ConflictResolution,
}

/// Aggregate outcome of one sync run.
///
/// `success` is true only when there were no failures *and* no conflicts; a
/// run whose conflicts all auto-resolved lost no data but is still reported
/// as not fully successful, so consumers must branch on `conflict_count`
/// independently of `failed_count`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub synced_count: usize,
    pub failed_count: usize,
    pub conflict_count: usize,
    pub errors: Vec<SyncItemError>,
    pub conflicts: Vec<SyncConflict>,
}

/// Stage of a sync run, for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStage {
    Starting,
    Syncing(OperationKind),
    ResolvingConflicts,
    Complete,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStage::Starting => f.write_str("starting"),
            SyncStage::Syncing(kind) => write!(f, "syncing-{kind}"),
            SyncStage::ResolvingConflicts => f.write_str("resolving-conflicts"),
            SyncStage::Complete => f.write_str("complete"),
        }
    }
}

/// Progress snapshot streamed to observers at stage transitions and around
/// each kind's batch. `current`/`total` are cumulative across kinds.
#[derive(Clone, Debug)]
pub struct SyncProgress {
    pub stage: SyncStage,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_last_write_wins() {
        assert_eq!(ConflictStrategy::default(), ConflictStrategy::LastWriteWins);
    }

    #[test]
    fn stage_display_matches_wire_form() {
        assert_eq!(SyncStage::Starting.to_string(), "starting");
        assert_eq!(
            SyncStage::Syncing(OperationKind::AttendanceBatch).to_string(),
            "syncing-attendance-batch"
        );
        assert_eq!(SyncStage::ResolvingConflicts.to_string(), "resolving-conflicts");
        assert_eq!(SyncStage::Complete.to_string(), "complete");
    }

    #[test]
    fn strategy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ConflictStrategy::LastWriteWins).unwrap(),
            "last-write-wins"
        );
        assert_eq!(
            serde_json::to_value(ConflictResolution::Pending).unwrap(),
            "pending"
        );
    }
}
