mod support;

use hajiri_queue::QueueStore;
use hajiri_types::OperationPayload;
use serde_json::json;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use support::{attendance_payload, harness};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test]
async fn transition_to_online_triggers_one_sync_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sync/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let h = harness(&server);
    h.monitor.set_online(false);
    h.store
        .append(OperationPayload::AttendanceBatch(attendance_payload("class-1")))
        .unwrap();

    let handle = hajiri_sync::spawn_auto_sync(
        h.engine.clone(),
        &h.monitor,
        Arc::new(AtomicBool::new(false)),
    );

    h.monitor.set_online(true);

    let store = h.store.clone();
    assert!(
        wait_until(Duration::from_secs(2), move || store.count(None).unwrap() == 0).await,
        "queue should drain after coming online"
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn transitions_during_an_active_run_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sync/attendance"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let h = harness(&server);
    h.monitor.set_online(false);
    h.store
        .append(OperationPayload::AttendanceBatch(attendance_payload("class-1")))
        .unwrap();

    let handle = hajiri_sync::spawn_auto_sync(
        h.engine.clone(),
        &h.monitor,
        Arc::new(AtomicBool::new(false)),
    );

    h.monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Flap connectivity while the first run is still in flight
    h.monitor.set_online(false);
    h.monitor.set_online(true);

    tokio::time::sleep(Duration::from_millis(700)).await;
    // The in-flight guard dropped the second trigger: one run, one request
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn repeated_online_reports_without_a_transition_are_quiet() {
    let server = MockServer::start().await;
    let h = harness(&server);
    // Already online; reporting online again is not a transition
    let handle = hajiri_sync::spawn_auto_sync(
        h.engine.clone(),
        &h.monitor,
        Arc::new(AtomicBool::new(false)),
    );

    h.monitor.set_online(true);
    h.monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(server.received_requests().await.unwrap().is_empty());
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_detaches_the_listener() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sync/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let h = harness(&server);
    h.monitor.set_online(false);
    h.store
        .append(OperationPayload::AttendanceBatch(attendance_payload("class-1")))
        .unwrap();

    let handle = hajiri_sync::spawn_auto_sync(
        h.engine.clone(),
        &h.monitor,
        Arc::new(AtomicBool::new(false)),
    );
    handle.shutdown().await;

    h.monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(server.received_requests().await.unwrap().is_empty());
}
