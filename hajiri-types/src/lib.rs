//! Shared data model for the Hajiri offline sync client.
//!
//! Defines the queued-operation record that the durable queue persists,
//! the payload shapes for the two operation kinds (attendance batches and
//! grade entries), the per-run sync report and progress types, and the
//! contract for the read-through reference cache used by offline forms.

mod operation;
mod reference;
mod sync;

pub use operation::{
    AttendanceBatchPayload, AttendanceRecord, AttendanceStatus, GradeEntryPayload, OperationKind,
    OperationPayload, QueuedOperation, SyncStatus,
};
pub use reference::{CacheError, ClassRecord, ReferenceCache, StudentRecord};
pub use sync::{
    ConflictResolution, ConflictStrategy, SyncConflict, SyncItemError, SyncProgress, SyncReport,
    SyncStage,
};
