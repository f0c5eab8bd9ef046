//! The `QueueStore` trait and its SQLite implementation.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, TimeZone, Utc};
use hajiri_types::{OperationKind, OperationPayload, QueuedOperation, SyncStatus};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const LAST_SYNC_TIME_KEY: &str = "last_sync_time";

/// Durable, per-origin storage of queued operations, partitioned by kind.
///
/// Operations are mutated in place by id and never duplicated. Deletion
/// happens only through [`cleanup`](QueueStore::cleanup) (synced records
/// past the retention window) or [`clear`](QueueStore::clear).
pub trait QueueStore: Send + Sync {
    /// Appends a new `pending` operation with `retry_count = 0` and returns
    /// its generated id.
    fn append(&self, payload: OperationPayload) -> StorageResult<String>;

    /// Point lookup by id.
    fn get(&self, id: &str) -> StorageResult<Option<QueuedOperation>>;

    /// Not-yet-synced operations in insertion (FIFO) order, optionally
    /// filtered by kind. Includes `error` records; the sync engine applies
    /// the retry ceiling.
    fn list_pending(&self, kind: Option<OperationKind>) -> StorageResult<Vec<QueuedOperation>>;

    /// Marks an operation synced and clears its last error. Idempotent;
    /// the synced timestamp is stamped once.
    fn mark_synced(&self, id: &str) -> StorageResult<()>;

    /// Records a failed submission attempt: sets the last error message and
    /// increments `retry_count` by exactly one.
    fn mark_error(&self, id: &str, message: &str) -> StorageResult<()>;

    /// Number of not-yet-synced operations, optionally filtered by kind.
    fn count(&self, kind: Option<OperationKind>) -> StorageResult<usize>;

    /// Deletes synced operations older than `max_age_days`. Returns the
    /// number of records removed.
    fn cleanup(&self, max_age_days: u32) -> StorageResult<usize>;

    /// Wipes all records. Test/reset only.
    fn clear(&self) -> StorageResult<()>;

    /// Timestamp of the last sync run that reached the network, if any.
    fn last_sync_time(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Persists the last sync timestamp so it survives reload.
    fn set_last_sync_time(&self, at: DateTime<Utc>) -> StorageResult<()>;
}

/// SQLite-backed queue store.
///
/// One `queue_operations` table partitioned by `kind` holds both logical
/// queues; a monotonic `seq` column preserves insertion order. A `meta`
/// key-value table carries the persisted last sync time.
#[derive(Clone)]
pub struct SqliteQueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueueStore {
    /// Opens or creates a queue store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory queue store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS queue_operations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            enqueued_at_ms INTEGER NOT NULL,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            synced_at_ms INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_queue_status_kind
            ON queue_operations (sync_status, kind);
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

impl QueueStore for SqliteQueueStore {
    fn append(&self, payload: OperationPayload) -> StorageResult<String> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let kind = payload.kind();
        let payload_json = match &payload {
            OperationPayload::AttendanceBatch(p) => serde_json::to_string(p)?,
            OperationPayload::GradeEntry(p) => serde_json::to_string(p)?,
        };

        conn.execute(
            "INSERT INTO queue_operations (id, kind, payload_json, enqueued_at_ms, sync_status) \
             VALUES (?, ?, ?, ?, 'pending')",
            params![id, kind.as_str(), payload_json, Utc::now().timestamp_millis()],
        )?;
        debug!(id = %id, kind = %kind, "queued operation");
        Ok(id)
    }

    fn get(&self, id: &str) -> StorageResult<Option<QueuedOperation>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, kind, payload_json, enqueued_at_ms, sync_status, retry_count, last_error, synced_at_ms \
                 FROM queue_operations WHERE id = ?",
                params![id],
                row_to_raw,
            )
            .optional()?;
        row.map(raw_to_operation).transpose()
    }

    fn list_pending(&self, kind: Option<OperationKind>) -> StorageResult<Vec<QueuedOperation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt;
        let rows = match kind {
            Some(kind) => {
                stmt = conn.prepare(
                    "SELECT id, kind, payload_json, enqueued_at_ms, sync_status, retry_count, last_error, synced_at_ms \
                     FROM queue_operations WHERE sync_status != 'synced' AND kind = ? ORDER BY seq",
                )?;
                stmt.query_map(params![kind.as_str()], row_to_raw)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                stmt = conn.prepare(
                    "SELECT id, kind, payload_json, enqueued_at_ms, sync_status, retry_count, last_error, synced_at_ms \
                     FROM queue_operations WHERE sync_status != 'synced' ORDER BY seq",
                )?;
                stmt.query_map([], row_to_raw)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        rows.into_iter().map(raw_to_operation).collect()
    }

    fn mark_synced(&self, id: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE queue_operations \
             SET sync_status = 'synced', last_error = NULL, \
                 synced_at_ms = COALESCE(synced_at_ms, ?) \
             WHERE id = ?",
            params![Utc::now().timestamp_millis(), id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn mark_error(&self, id: &str, message: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE queue_operations \
             SET sync_status = 'error', last_error = ?, retry_count = retry_count + 1 \
             WHERE id = ?",
            params![message, id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count(&self, kind: Option<OperationKind>) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = match kind {
            Some(kind) => conn.query_row(
                "SELECT COUNT(*) FROM queue_operations WHERE sync_status != 'synced' AND kind = ?",
                params![kind.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM queue_operations WHERE sync_status != 'synced'",
                [],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    fn cleanup(&self, max_age_days: u32) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let cutoff_ms =
            (Utc::now() - chrono::Duration::days(max_age_days as i64)).timestamp_millis();
        let deleted = conn.execute(
            "DELETE FROM queue_operations \
             WHERE sync_status = 'synced' AND synced_at_ms IS NOT NULL AND synced_at_ms < ?",
            params![cutoff_ms],
        )?;
        if deleted > 0 {
            debug!(deleted, "cleaned up old synced operations");
        }
        Ok(deleted)
    }

    fn clear(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM queue_operations", [])?;
        conn.execute("DELETE FROM meta WHERE key = ?", params![LAST_SYNC_TIME_KEY])?;
        Ok(())
    }

    fn last_sync_time(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                params![LAST_SYNC_TIME_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
                    StorageError::Corrupt {
                        id: LAST_SYNC_TIME_KEY.to_string(),
                        detail: e.to_string(),
                    }
                })?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    fn set_last_sync_time(&self, at: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_SYNC_TIME_KEY, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Raw row values, decoded into a `QueuedOperation` outside the statement
/// borrow so payload parse failures map to `StorageError::Corrupt` instead
/// of being silently dropped.
struct RawRow {
    id: String,
    kind: String,
    payload_json: String,
    enqueued_at_ms: i64,
    sync_status: String,
    retry_count: i64,
    last_error: Option<String>,
    synced_at_ms: Option<i64>,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        payload_json: row.get(2)?,
        enqueued_at_ms: row.get(3)?,
        sync_status: row.get(4)?,
        retry_count: row.get(5)?,
        last_error: row.get(6)?,
        synced_at_ms: row.get(7)?,
    })
}

fn raw_to_operation(raw: RawRow) -> StorageResult<QueuedOperation> {
    let corrupt = |detail: String| StorageError::Corrupt {
        id: raw.id.clone(),
        detail,
    };

    let kind: OperationKind = raw.kind.parse().map_err(&corrupt)?;
    let payload = OperationPayload::from_json(kind, &raw.payload_json)
        .map_err(|e| corrupt(e.to_string()))?;
    let sync_status: SyncStatus = raw.sync_status.parse().map_err(&corrupt)?;
    let enqueued_at = Utc
        .timestamp_millis_opt(raw.enqueued_at_ms)
        .single()
        .ok_or_else(|| corrupt(format!("bad enqueued_at: {}", raw.enqueued_at_ms)))?;
    let synced_at = match raw.synced_at_ms {
        Some(ms) => Some(
            Utc.timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| corrupt(format!("bad synced_at: {ms}")))?,
        ),
        None => None,
    };

    Ok(QueuedOperation {
        id: raw.id,
        kind,
        payload,
        enqueued_at,
        sync_status,
        retry_count: raw.retry_count as u32,
        last_error: raw.last_error,
        synced_at,
    })
}
