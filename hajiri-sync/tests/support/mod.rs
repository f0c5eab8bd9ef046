#![allow(dead_code)]

use hajiri_queue::SqliteQueueStore;
use hajiri_sync::{NetworkMonitor, RequestGate, SyncApiClient, SyncConfig, SyncEngine};
use hajiri_types::{
    AttendanceBatchPayload, AttendanceRecord, AttendanceStatus, GradeEntryPayload,
};
use std::sync::Arc;
use wiremock::MockServer;

pub fn attendance_payload(class_id: &str) -> AttendanceBatchPayload {
    AttendanceBatchPayload {
        class_id: class_id.into(),
        date: "2024-01-15".into(),
        date_bs: "2080-10-01".into(),
        records: vec![
            AttendanceRecord {
                student_id: "student-1".into(),
                status: AttendanceStatus::Present,
                period_number: None,
                remarks: None,
            },
            AttendanceRecord {
                student_id: "student-2".into(),
                status: AttendanceStatus::Absent,
                period_number: None,
                remarks: None,
            },
        ],
        marked_by: "teacher-1".into(),
    }
}

pub fn grade_payload(student_id: &str) -> GradeEntryPayload {
    GradeEntryPayload {
        exam_id: "exam-1".into(),
        student_id: student_id.into(),
        theory_marks: Some(40.0),
        practical_marks: Some(15.0),
        total_marks: 55.0,
        remarks: None,
        entered_by: "teacher-1".into(),
    }
}

pub fn test_config(server: &MockServer) -> SyncConfig {
    SyncConfig {
        api_base_url: server.uri(),
        api_token: None,
        request_timeout_secs: 5,
        ..SyncConfig::default()
    }
}

/// Everything a sync test needs, wired the way production composes it.
pub struct Harness {
    pub store: Arc<SqliteQueueStore>,
    pub monitor: Arc<NetworkMonitor>,
    pub gate: Arc<RequestGate>,
    pub engine: Arc<SyncEngine>,
    pub config: SyncConfig,
}

pub fn harness(server: &MockServer) -> Harness {
    let config = test_config(server);
    let store = Arc::new(SqliteQueueStore::open_in_memory().unwrap());
    let monitor = Arc::new(NetworkMonitor::new(true));
    let gate = Arc::new(RequestGate::new(
        config.max_concurrent_requests,
        config.lite_max_concurrent_requests,
    ));
    let api = Arc::new(SyncApiClient::new(config.clone()));
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        api,
        gate.clone(),
        monitor.subscribe(),
        config.clone(),
    ));

    Harness {
        store,
        monitor,
        gate,
        engine,
        config,
    }
}
