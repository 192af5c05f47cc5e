//! Types for the processing queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = i64;
pub type StoreId = i64;
pub type BatchId = i64;

/// Errors returned when submitting jobs.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The tracking number is empty or whitespace.
    #[error("invalid tracking number: {0:?}")]
    InvalidTrackNumber(String),
}

/// Where a job came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    #[default]
    Manual,
    Excel,
    Auto,
    Api,
}

impl TrackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackSource::Manual => "manual",
            TrackSource::Excel => "excel",
            TrackSource::Auto => "auto",
            TrackSource::Api => "api",
        }
    }
}

/// One tracking number waiting to be scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTrack {
    pub track_number: String,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub batch_id: BatchId,
    pub source: TrackSource,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedTrack {
    pub fn new(
        track_number: impl Into<String>,
        store_id: StoreId,
        user_id: UserId,
        batch_id: BatchId,
        source: TrackSource,
    ) -> Self {
        Self {
            track_number: track_number.into(),
            store_id,
            user_id,
            batch_id,
            source,
            enqueued_at: Utc::now(),
        }
    }
}

/// How a single job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Events found and saved.
    Success,
    /// The carrier has nothing for this number yet.
    EmptyResult,
    /// Automation-level fault; the queue pauses.
    TransientFault,
    /// Anything else, including a panicking scrape or a failed save.
    UnexpectedFault,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::EmptyResult => "empty_result",
            JobOutcome::TransientFault => "transient_fault",
            JobOutcome::UnexpectedFault => "unexpected_fault",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }
}

/// What one consumer tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running.
    Busy,
    /// Dequeuing is suspended until the given instant.
    Paused { until: DateTime<Utc> },
    /// Nothing to do.
    Idle,
    Processed {
        track_number: String,
        batch_id: BatchId,
        outcome: JobOutcome,
        batch_finished: bool,
    },
}

/// Current status of the processing queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Whether the background consumer is running.
    pub running: bool,
    /// Jobs waiting in the queue.
    pub queue_len: usize,
    pub paused: bool,
    pub pause_until: Option<DateTime<Utc>>,
    /// Batches with unprocessed jobs.
    pub active_batches: usize,
    /// Jobs processed since startup.
    pub processed_total: u64,
    /// Estimated time to drain the current queue (seconds).
    pub estimated_drain_secs: u64,
}
