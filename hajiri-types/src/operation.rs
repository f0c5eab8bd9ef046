//! Queued operations and their kind-specific payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminator for the kind of offline-originated work a queue entry holds.
///
/// One attendance batch bundles every student record marked in a single
/// offline session for one class/date. One grade entry represents exactly
/// one student's grade for one exam. The sync engine never merges or splits
/// entries across this boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    AttendanceBatch,
    GradeEntry,
}

impl OperationKind {
    /// All kinds, in the order the sync engine processes them.
    pub const ALL: [OperationKind; 2] = [OperationKind::AttendanceBatch, OperationKind::GradeEntry];

    /// Stable string form used in storage and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::AttendanceBatch => "attendance-batch",
            OperationKind::GradeEntry => "grade-entry",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance-batch" => Ok(OperationKind::AttendanceBatch),
            "grade-entry" => Ok(OperationKind::GradeEntry),
            other => Err(format!("unknown operation kind: {other}")),
        }
    }
}

/// Attendance status for a single student on a single day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

/// One student's attendance mark within a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Every attendance mark taken in one offline session for one class/date.
///
/// `date` is the civil (Gregorian) form; `date_bs` is the local-calendar
/// form supplied by the caller. Calendar conversion is not this crate's
/// concern; both strings pass through to the wire unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBatchPayload {
    pub class_id: String,
    pub date: String,
    #[serde(rename = "dateBS")]
    pub date_bs: String,
    pub records: Vec<AttendanceRecord>,
    pub marked_by: String,
}

/// One student's grade for one exam.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntryPayload {
    pub exam_id: String,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theory_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practical_marks: Option<f64>,
    pub total_marks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub entered_by: String,
}

/// Kind-specific payload of a queued operation. Opaque to the queue store;
/// the sync engine only routes it to the matching endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationPayload {
    AttendanceBatch(AttendanceBatchPayload),
    GradeEntry(GradeEntryPayload),
}

impl OperationPayload {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationPayload::AttendanceBatch(_) => OperationKind::AttendanceBatch,
            OperationPayload::GradeEntry(_) => OperationKind::GradeEntry,
        }
    }

    /// Deserializes a payload of a known kind. The kind column in storage is
    /// authoritative; this avoids relying on untagged inference.
    pub fn from_json(kind: OperationKind, json: &str) -> serde_json::Result<Self> {
        match kind {
            OperationKind::AttendanceBatch => {
                serde_json::from_str(json).map(OperationPayload::AttendanceBatch)
            }
            OperationKind::GradeEntry => serde_json::from_str(json).map(OperationPayload::GradeEntry),
        }
    }
}

/// Sync lifecycle state of a queued operation.
///
/// `Synced` is terminal. `Error` is retriable until the retry ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "error" => Ok(SyncStatus::Error),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// One unit of offline-originated work, as persisted by the queue store.
///
/// Mutated in place by id, never duplicated. Deleted only by the retention
/// cleanup pass (synced and older than the window) or an explicit clear.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    pub id: String,
    pub kind: OperationKind,
    pub payload: OperationPayload,
    pub enqueued_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}
