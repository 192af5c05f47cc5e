//! Single-consumer processing queue for tracking-number jobs.
//!
//! Producers call [`ProcessingQueue::enqueue`]; a background consumer pops
//! one job per tick, scrapes it through a pooled session, records batch
//! progress and reports it to the job's owner.

mod config;
mod pause;
mod runner;
mod types;

pub use config::QueueConfig;
pub use pause::PauseGate;
pub use runner::ProcessingQueue;
pub use types::{
    BatchId, JobOutcome, QueueError, QueueStatus, QueuedTrack, StoreId, TickOutcome, TrackSource,
    UserId,
};
