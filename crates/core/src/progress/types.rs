//! Progress snapshot types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::queue::BatchId;

/// Snapshot of one batch's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub batch_id: BatchId,
    pub total: u64,
    pub processed: u64,
    pub success: u64,
    pub failed: u64,
    pub started_at: DateTime<Utc>,
    /// Time since the batch was first seen, as `m:ss`.
    pub elapsed_label: String,
}

impl BatchProgress {
    /// Whether every job of the batch has been processed.
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// Formats a duration as `minutes:seconds`, seconds zero-padded.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
