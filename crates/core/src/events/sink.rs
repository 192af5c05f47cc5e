use async_trait::async_trait;

use crate::queue::{BatchId, UserId};

use super::ProgressEvent;

/// Delivers progress events to the user owning a job.
///
/// Delivery is fire-and-forget: the queue does not wait for acknowledgement
/// and a sink must not fail the caller.
#[async_trait]
pub trait ProgressEventSink: Send + Sync {
    async fn send(&self, user_id: UserId, event: ProgressEvent);
}

/// Receives one ping per completed job, keyed only by batch.
#[async_trait]
pub trait ProgressAggregator: Send + Sync {
    async fn track_processed(&self, batch_id: BatchId);
}
