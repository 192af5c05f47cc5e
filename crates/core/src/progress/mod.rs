//! Per-batch progress counters.
//!
//! Entries are created on first sight of a batch and removed the moment the
//! batch's last job has been processed.

mod tracker;
mod types;

pub use tracker::{BatchCounters, ProgressTracker};
pub use types::{format_elapsed, BatchProgress};
