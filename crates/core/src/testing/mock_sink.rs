//! Recording event sink and aggregator.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::events::{ProgressAggregator, ProgressEvent, ProgressEventSink};
use crate::queue::{BatchId, UserId};

/// Sink that keeps every event it is sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<RwLock<Vec<(UserId, ProgressEvent)>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events with their addressee, in send order.
    pub async fn events(&self) -> Vec<(UserId, ProgressEvent)> {
        self.events.read().await.clone()
    }

    pub async fn events_for(&self, user_id: UserId) -> Vec<ProgressEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl ProgressEventSink for RecordingEventSink {
    async fn send(&self, user_id: UserId, event: ProgressEvent) {
        self.events.write().await.push((user_id, event));
    }
}

/// Aggregator that keeps every batch ping.
#[derive(Debug, Clone, Default)]
pub struct RecordingAggregator {
    pings: Arc<RwLock<Vec<BatchId>>>,
}

impl RecordingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pings(&self) -> Vec<BatchId> {
        self.pings.read().await.clone()
    }
}

#[async_trait]
impl ProgressAggregator for RecordingAggregator {
    async fn track_processed(&self, batch_id: BatchId) {
        self.pings.write().await.push(batch_id);
    }
}
