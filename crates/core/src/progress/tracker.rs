//! Concurrent map of batch counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::queue::BatchId;

use super::types::{format_elapsed, BatchProgress};

/// Live counters for one batch.
///
/// Counters only ever grow. After each completed job
/// `processed == success + failed` and `processed <= total`.
#[derive(Debug)]
pub struct BatchCounters {
    batch_id: BatchId,
    total: AtomicU64,
    processed: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl BatchCounters {
    fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            total: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Marks one more job of the batch as taken, returning the previous
    /// `processed` count. A batch first seen at drain time gets its total
    /// raised so it never trails `processed`.
    pub fn begin_job(&self) -> u64 {
        let previous = self.processed.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_max(previous + 1, Ordering::SeqCst);
        previous
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_complete(&self) -> bool {
        self.processed() == self.total()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> BatchProgress {
        BatchProgress {
            batch_id: self.batch_id,
            total: self.total(),
            processed: self.processed(),
            success: self.success.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            started_at: self.started_at,
            elapsed_label: format_elapsed(self.elapsed()),
        }
    }
}

/// Batch counters keyed by batch id, created on first use.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    batches: RwLock<HashMap<BatchId, Arc<BatchCounters>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `jobs` to the batch's total, creating the entry if needed.
    pub fn register_jobs(&self, batch_id: BatchId, jobs: u64) -> Arc<BatchCounters> {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        let counters = batches
            .entry(batch_id)
            .or_insert_with(|| Arc::new(BatchCounters::new(batch_id)));
        counters.total.fetch_add(jobs, Ordering::SeqCst);
        Arc::clone(counters)
    }

    /// Returns the batch's counters, creating an empty entry if unseen.
    pub fn get_or_create(&self, batch_id: BatchId) -> Arc<BatchCounters> {
        if let Some(counters) = self.counters(batch_id) {
            return counters;
        }
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            batches
                .entry(batch_id)
                .or_insert_with(|| Arc::new(BatchCounters::new(batch_id))),
        )
    }

    pub fn counters(&self, batch_id: BatchId) -> Option<Arc<BatchCounters>> {
        self.batches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&batch_id)
            .cloned()
    }

    /// Snapshot of a batch still in flight. Finished batches are not found.
    pub fn get(&self, batch_id: BatchId) -> Option<BatchProgress> {
        self.counters(batch_id).map(|c| c.snapshot())
    }

    /// Removes the batch if all of its jobs have been processed, returning
    /// its final snapshot.
    pub fn finish_if_complete(&self, batch_id: BatchId) -> Option<BatchProgress> {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        let complete = batches.get(&batch_id).is_some_and(|c| c.is_complete());
        if !complete {
            return None;
        }
        batches.remove(&batch_id).map(|c| c.snapshot())
    }

    /// Number of batches currently tracked.
    pub fn active_batches(&self) -> usize {
        self.batches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
