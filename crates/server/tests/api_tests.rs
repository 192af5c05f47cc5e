//! API tests over the in-process router.
//!
//! Run with: cargo test -p parcelwatch-server --test api_tests

mod common;

use axum::http::StatusCode;
use common::{fixtures, TestFixture};
use parcelwatch_core::{JobOutcome, ProgressEvent, ScrapeError, TickOutcome};
use parcelwatch_server::api::WsMessage;
use serde_json::json;

fn submission(batch_id: i64, numbers: &[&str]) -> serde_json::Value {
    json!({
        "user_id": 7,
        "store_id": 3,
        "batch_id": batch_id,
        "track_numbers": numbers,
    })
}

// =============================================================================
// Health and config
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_hides_api_key() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["queue"]["enabled"], false);
    assert_eq!(response.body["carrier"]["api_key_configured"], false);
    assert!(response.body["carrier"].get("api_key").is_none());
}

// =============================================================================
// Intake
// =============================================================================

#[tokio::test]
async fn test_enqueue_accepts_batch() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/tracks", submission(11, &["RR1", "RR2", "RR3"]))
        .await;

    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["batch_id"], 11);
    assert_eq!(response.body["enqueued"], 3);
    assert_eq!(response.body["queue_len"], 3);
    assert_eq!(response.body["estimated_wait_secs"], 30);
    assert_eq!(fixture.queue.queue_len(), 3);
}

#[tokio::test]
async fn test_enqueue_allocates_batch_id_when_absent() {
    let fixture = TestFixture::new().await;

    let first = fixture
        .post(
            "/api/v1/tracks",
            json!({ "user_id": 1, "store_id": 1, "track_numbers": ["A1"] }),
        )
        .await;
    let second = fixture
        .post(
            "/api/v1/tracks",
            json!({ "user_id": 1, "store_id": 1, "track_numbers": ["A2"] }),
        )
        .await;

    assert_status!(first, StatusCode::ACCEPTED);
    assert_status!(second, StatusCode::ACCEPTED);
    let first_id = first.body["batch_id"].as_i64().unwrap();
    let second_id = second.body["batch_id"].as_i64().unwrap();
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn test_enqueue_rejects_empty_list() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/api/v1/tracks", submission(1, &[])).await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("cannot be empty"));
}

#[tokio::test]
async fn test_enqueue_rejects_blank_number_without_partial_insert() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/tracks", submission(1, &["RR1", "   "]))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.queue.queue_len(), 0);
    assert!(fixture.queue.get_progress(1).is_none());
}

#[tokio::test]
async fn test_enqueue_malformed_json() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_raw("/api/v1/tracks", "{not json").await;

    assert!(response.status.is_client_error());
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_batch_progress_through_processing() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/tracks", submission(20, &["RR1", "RR2"]))
        .await;

    let response = fixture.get("/api/v1/batches/20").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 2);
    assert_eq!(response.body["processed"], 0);

    fixture.tick().await;

    let response = fixture.get("/api/v1/batches/20").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["processed"], 1);
    assert_eq!(response.body["success"], 1);
    assert_eq!(response.body["failed"], 0);

    fixture.tick().await;

    // Finished batches are forgotten.
    let response = fixture.get("/api/v1/batches/20").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/batches/999").await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(response.body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_batch_wait_estimate() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/tracks", submission(1, &["A1", "A2"])).await;
    fixture.post("/api/v1/tracks", submission(2, &["B1"])).await;

    let response = fixture.get("/api/v1/batches/2/wait").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["queued"], true);
    assert_eq!(response.body["estimated_wait_secs"], 30);

    let response = fixture.get("/api/v1/batches/1/wait").await;
    assert_eq!(response.body["estimated_wait_secs"], 20);

    let response = fixture.get("/api/v1/batches/3/wait").await;
    assert_eq!(response.body["queued"], false);
    assert_eq!(response.body["estimated_wait_secs"], 0);
}

// =============================================================================
// Tracks
// =============================================================================

#[tokio::test]
async fn test_processed_track_is_stored() {
    let fixture = TestFixture::new().await;
    fixture
        .scraper
        .set_result(
            "RR42",
            Ok(vec![
                fixtures::track_event("Out for delivery"),
                fixtures::track_event("Accepted"),
            ]),
        )
        .await;
    fixture.post("/api/v1/tracks", submission(5, &["RR42"])).await;

    let outcome = fixture.tick().await;
    assert!(matches!(
        outcome,
        TickOutcome::Processed {
            outcome: JobOutcome::Success,
            batch_finished: true,
            ..
        }
    ));

    let response = fixture.get("/api/v1/tracks/RR42").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["track_number"], "RR42");
    assert_eq!(response.body["store_id"], 3);
    assert_eq!(response.body["user_id"], 7);
    assert_eq!(response.body["last_status"], "Out for delivery");
    assert_eq!(response.body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_track_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/tracks/NOPE").await;

    assert_status!(response, StatusCode::NOT_FOUND);
}

// =============================================================================
// Queue status and carrier faults
// =============================================================================

#[tokio::test]
async fn test_queue_status_reports_pool() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/tracks", submission(1, &["A1"])).await;

    let response = fixture.get("/api/v1/queue/status").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["queue"]["running"], false);
    assert_eq!(response.body["queue"]["queue_len"], 1);
    assert_eq!(response.body["queue"]["paused"], false);
    assert_eq!(response.body["queue"]["active_batches"], 1);
    assert_eq!(response.body["sessions"]["size"], 2);
    assert_eq!(response.body["sessions"]["idle"], 2);
    assert_eq!(response.body["sessions"]["in_use"], 0);
}

#[tokio::test]
async fn test_carrier_fault_pauses_queue_and_notifies_owner() {
    let fixture = TestFixture::new().await;
    let mut rx = fixture.ws_broadcaster.subscribe();
    fixture
        .scraper
        .set_next_error(ScrapeError::Browser("renderer crashed".to_string()))
        .await;
    fixture
        .post("/api/v1/tracks", submission(9, &["X1", "X2"]))
        .await;

    let outcome = fixture.tick().await;
    assert!(matches!(
        outcome,
        TickOutcome::Processed {
            outcome: JobOutcome::TransientFault,
            ..
        }
    ));

    let response = fixture.get("/api/v1/queue/status").await;
    assert_eq!(response.body["queue"]["paused"], true);
    assert!(response.body["queue"]["pause_until"].is_string());
    assert_eq!(response.body["queue"]["queue_len"], 1);

    // The second job waits out the cooldown.
    assert!(matches!(fixture.tick().await, TickOutcome::Paused { .. }));
    assert_eq!(fixture.scraper.call_count().await, 1);

    let mut saw_unavailable = false;
    while let Ok(addressed) = rx.try_recv() {
        if let WsMessage::Progress {
            event: ProgressEvent::CarrierUnavailable { track_number, .. },
        } = &addressed.message
        {
            assert_eq!(track_number, "X1");
            assert_eq!(addressed.user_id, Some(7));
            saw_unavailable = true;
        }
    }
    assert!(saw_unavailable);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/tracks", submission(1, &["A1"])).await;
    fixture.drain().await;

    let (status, body) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("parcelwatch_queue_length"));
    assert!(body.contains("parcelwatch_sessions_idle"));
    assert!(body.contains("parcelwatch_jobs_processed_total"));
}
