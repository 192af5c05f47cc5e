//! Tracking intake and progress API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parcelwatch_core::{
    BatchId, BatchProgress, PoolStatus, QueueStatus, QueuedTrack, StoreId, TrackEvent,
    TrackRecord, TrackSource, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// Maximum tracking numbers accepted in one submission
const MAX_TRACKS_PER_REQUEST: usize = 5000;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting tracking numbers
#[derive(Debug, Deserialize)]
pub struct EnqueueTracksBody {
    pub user_id: UserId,
    pub store_id: StoreId,
    /// Batch to add the numbers to; a new one is allocated when absent
    pub batch_id: Option<BatchId>,
    #[serde(default = "default_source")]
    pub source: TrackSource,
    pub track_numbers: Vec<String>,
}

fn default_source() -> TrackSource {
    TrackSource::Api
}

#[derive(Debug, Serialize)]
pub struct EnqueueTracksResponse {
    pub batch_id: BatchId,
    pub enqueued: usize,
    pub queue_len: usize,
    /// Estimated seconds until the last submitted number is processed
    pub estimated_wait_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct BatchWaitResponse {
    pub batch_id: BatchId,
    /// Whether any job of the batch is still waiting in the queue
    pub queued: bool,
    pub estimated_wait_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    #[serde(flatten)]
    pub record: TrackRecord,
    pub events: Vec<TrackEvent>,
}

#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub queue: QueueStatus,
    pub sessions: PoolStatus,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ApiErrorResponse>) {
    (
        status,
        Json(ApiErrorResponse {
            error: error.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit tracking numbers for scraping
pub async fn enqueue_tracks(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueTracksBody>,
) -> Result<(StatusCode, Json<EnqueueTracksResponse>), impl IntoResponse> {
    if body.track_numbers.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "track_numbers cannot be empty",
        ));
    }
    if body.track_numbers.len() > MAX_TRACKS_PER_REQUEST {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "at most {} track_numbers per request",
                MAX_TRACKS_PER_REQUEST
            ),
        ));
    }

    let batch_id = body.batch_id.unwrap_or_else(|| state.next_batch_id());
    let jobs: Vec<QueuedTrack> = body
        .track_numbers
        .iter()
        .map(|number| {
            QueuedTrack::new(
                number.trim(),
                body.store_id,
                body.user_id,
                batch_id,
                body.source,
            )
        })
        .collect();
    let enqueued = jobs.len();

    match state.queue().enqueue_all(jobs) {
        Ok(queue_len) => Ok((
            StatusCode::ACCEPTED,
            Json(EnqueueTracksResponse {
                batch_id,
                enqueued,
                queue_len,
                estimated_wait_secs: state.queue().estimate_wait_time(queue_len).as_secs(),
            }),
        )),
        Err(e) => Err(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// Get progress of a batch still being processed
pub async fn get_batch_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BatchId>,
) -> Result<Json<BatchProgress>, impl IntoResponse> {
    match state.queue().get_progress(id) {
        Some(progress) => Ok(Json(progress)),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Batch not in progress: {}", id),
        )),
    }
}

/// Estimate how long until a batch's queued jobs are done
pub async fn get_batch_wait(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BatchId>,
) -> Json<BatchWaitResponse> {
    let wait = state.queue().estimate_wait_for_batch(id);
    Json(BatchWaitResponse {
        batch_id: id,
        queued: wait.is_some(),
        estimated_wait_secs: wait.map(|d| d.as_secs()).unwrap_or(0),
    })
}

/// Get the stored state and history of one tracking number
pub async fn get_track(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<Json<TrackResponse>, impl IntoResponse> {
    let store = state.track_store();
    let record = match store.get(&number) {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Err(error_response(
                StatusCode::NOT_FOUND,
                format!("Track not found: {}", number),
            ))
        }
        Err(e) => {
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    };

    match store.events_for(&number) {
        Ok(events) => Ok(Json(TrackResponse { record, events })),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// Queue and session pool status
pub async fn get_queue_status(State(state): State<Arc<AppState>>) -> Json<QueueStatusResponse> {
    Json(QueueStatusResponse {
        queue: state.queue().status(),
        sessions: state.pool().status(),
    })
}
