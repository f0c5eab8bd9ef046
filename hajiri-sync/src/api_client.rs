//! HTTP client for the school management API.
//!
//! Submits queued attendance batches and grade entries, and classifies each
//! response into accepted / conflict / error. A conflict is either an HTTP
//! 409 carrying the server's current state, or a 2xx body embedding a
//! non-empty `conflicts[]` array with per-record server data.

use crate::config::SyncConfig;
use crate::error::SyncError;
use hajiri_types::{AttendanceBatchPayload, AttendanceStatus, GradeEntryPayload};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Classified outcome of one wire submission.
#[derive(Clone, Debug)]
pub enum SubmitOutcome {
    /// The server accepted the submission as-is.
    Accepted,
    /// The server's state diverges from what the operation assumed.
    /// `server_data` is the server-side snapshot reported back.
    Conflict { server_data: Value },
}

/// One record within the attendance sync request body. Batch-level fields
/// (class, date, marker) are repeated per record on the wire.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAttendanceRecord<'a> {
    student_id: &'a str,
    class_id: &'a str,
    date: &'a str,
    #[serde(rename = "dateBS")]
    date_bs: &'a str,
    status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    period_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remarks: Option<&'a str>,
    marked_by: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendanceSyncRequest<'a> {
    records: Vec<WireAttendanceRecord<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    force_update: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeSyncRequest<'a> {
    student_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    theory_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    practical_marks: Option<f64>,
    total_marks: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    remarks: Option<&'a str>,
    entered_by: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    force_update: Option<bool>,
}

/// HTTP client for the attendance and grade sync endpoints.
pub struct SyncApiClient {
    client: Client,
    config: SyncConfig,
}

impl SyncApiClient {
    pub fn new(config: SyncConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self { client, config }
    }

    /// Submits one attendance batch as a single wire request. The batch is
    /// accepted, conflicted, or failed as a unit.
    pub async fn submit_attendance_batch(
        &self,
        payload: &AttendanceBatchPayload,
        force: bool,
    ) -> Result<SubmitOutcome, SyncError> {
        let records = payload
            .records
            .iter()
            .map(|r| WireAttendanceRecord {
                student_id: &r.student_id,
                class_id: &payload.class_id,
                date: &payload.date,
                date_bs: &payload.date_bs,
                status: r.status,
                period_number: r.period_number,
                remarks: r.remarks.as_deref(),
                marked_by: &payload.marked_by,
            })
            .collect();

        let body = AttendanceSyncRequest {
            records,
            force_update: force.then_some(true),
        };

        self.post("/api/sync/attendance", &body).await
    }

    /// Submits one student's grade for one exam.
    pub async fn submit_grade_entry(
        &self,
        payload: &GradeEntryPayload,
        force: bool,
    ) -> Result<SubmitOutcome, SyncError> {
        let body = GradeSyncRequest {
            student_id: &payload.student_id,
            theory_marks: payload.theory_marks,
            practical_marks: payload.practical_marks,
            total_marks: payload.total_marks,
            remarks: payload.remarks.as_deref(),
            entered_by: &payload.entered_by,
            force_update: force.then_some(true),
        };

        let path = format!("/api/exams/{}/grades", payload.exam_id);
        self.post(&path, &body).await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<SubmitOutcome, SyncError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        classify(path, resp).await
    }
}

/// Maps a response to an outcome: 409 and embedded `conflicts[]` become
/// conflicts, other non-2xx statuses become API errors.
async fn classify(path: &str, resp: reqwest::Response) -> Result<SubmitOutcome, SyncError> {
    let status = resp.status();

    if status == reqwest::StatusCode::CONFLICT {
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let server_data = body.get("data").cloned().unwrap_or(body);
        debug!(path, "submission conflicted (409)");
        return Ok(SubmitOutcome::Conflict { server_data });
    }

    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(SyncError::Api(format!("{path} returned {status}: {detail}")));
    }

    // 2xx: an empty or non-JSON body is still an acceptance
    let body = resp.text().await.unwrap_or_default();
    if let Ok(json) = serde_json::from_str::<Value>(&body) {
        if let Some(conflicts) = json.get("conflicts").and_then(Value::as_array) {
            if !conflicts.is_empty() {
                debug!(path, count = conflicts.len(), "submission accepted with embedded conflicts");
                return Ok(SubmitOutcome::Conflict {
                    server_data: Value::Array(conflicts.clone()),
                });
            }
        }
    }

    Ok(SubmitOutcome::Accepted)
}
