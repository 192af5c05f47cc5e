use serde::{Deserialize, Serialize};

use crate::queue::BatchId;

/// Status text reported for a track whose lookup returned no events.
pub const NO_DATA_STATUS: &str = "no data";

/// Event addressed to the user who owns a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// First job of a batch was taken off the queue.
    BatchStarted { batch_id: BatchId, total: u64 },
    TrackProcessed {
        batch_id: BatchId,
        track_number: String,
        status: String,
        processed: u64,
        total: u64,
    },
    BatchFinished {
        batch_id: BatchId,
        processed: u64,
        success: u64,
        failed: u64,
        /// `m:ss` since the batch was first seen.
        elapsed: String,
    },
    /// The carrier is misbehaving and processing is paused for a while.
    CarrierUnavailable {
        track_number: String,
        retry_after_secs: u64,
    },
}

impl ProgressEvent {
    /// Batch the event belongs to, if any.
    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            ProgressEvent::BatchStarted { batch_id, .. }
            | ProgressEvent::TrackProcessed { batch_id, .. }
            | ProgressEvent::BatchFinished { batch_id, .. } => Some(*batch_id),
            ProgressEvent::CarrierUnavailable { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::BatchStarted { .. } => "batch_started",
            ProgressEvent::TrackProcessed { .. } => "track_processed",
            ProgressEvent::BatchFinished { .. } => "batch_finished",
            ProgressEvent::CarrierUnavailable { .. } => "carrier_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let event = ProgressEvent::BatchStarted {
            batch_id: 10,
            total: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_started");
        assert_eq!(json["batch_id"], 10);
        assert_eq!(json["total"], 2);
    }

    #[test]
    fn test_deserialize_track_processed() {
        let json = r#"{"type":"track_processed","batch_id":3,"track_number":"T1","status":"Delivered","processed":1,"total":4}"#;
        let event: ProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.batch_id(), Some(3));
        assert_eq!(event.name(), "track_processed");
    }

    #[test]
    fn test_carrier_unavailable_has_no_batch() {
        let event = ProgressEvent::CarrierUnavailable {
            track_number: "T1".to_string(),
            retry_after_secs: 60,
        };
        assert_eq!(event.batch_id(), None);
        assert_eq!(event.name(), "carrier_unavailable");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "carrier_unavailable");
    }
}
