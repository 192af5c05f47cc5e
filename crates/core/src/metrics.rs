//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue intake and processing outcomes
//! - The carrier pause window
//! - Scrape latency

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Queue
// =============================================================================

/// Jobs accepted into the queue by source.
pub static JOBS_ENQUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelwatch_jobs_enqueued_total", "Total jobs enqueued"),
        &["source"], // "manual", "excel", "auto", "api"
    )
    .unwrap()
});

/// Jobs taken off the queue by outcome.
pub static JOBS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelwatch_jobs_processed_total", "Total jobs processed"),
        &["outcome"], // "success", "empty_result", "transient_fault", "unexpected_fault"
    )
    .unwrap()
});

/// Batches whose last job has been processed.
pub static BATCHES_FINISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "parcelwatch_batches_finished_total",
        "Total batches fully processed",
    )
    .unwrap()
});

/// Times the pause window was (re)armed after a carrier fault.
pub static PAUSE_TRIPS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "parcelwatch_pause_trips_total",
        "Total carrier faults that paused the queue",
    )
    .unwrap()
});

// =============================================================================
// Carrier
// =============================================================================

/// Time spent inside the scrape client, per job.
pub static SCRAPE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "parcelwatch_scrape_duration_seconds",
            "Duration of a single tracking-number scrape",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_ENQUEUED.clone()),
        Box::new(JOBS_PROCESSED.clone()),
        Box::new(BATCHES_FINISHED.clone()),
        Box::new(PAUSE_TRIPS.clone()),
        Box::new(SCRAPE_DURATION.clone()),
    ]
}
