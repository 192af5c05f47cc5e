//! Test doubles for the queue's collaborators.
//!
//! Everything here is in-memory and records what it was asked to do, so a
//! full `ProcessingQueue` can be driven tick by tick without a carrier,
//! browser or database.
//!
//! # Example
//!
//! ```rust,ignore
//! use parcelwatch_core::testing::{MockScrapeClient, MockSessionFactory, RecordingEventSink};
//!
//! let factory = MockSessionFactory::new();
//! let client = MockScrapeClient::new();
//! client.set_next_error(ScrapeError::Browser("crashed".into())).await;
//! ```

mod mock_scrape_client;
mod mock_session;
mod mock_sink;
mod mock_track_service;

pub use mock_scrape_client::{MockScrapeClient, RecordedScrape};
pub use mock_session::{MockSession, MockSessionFactory};
pub use mock_sink::{RecordingAggregator, RecordingEventSink};
pub use mock_track_service::{MockTrackService, RecordedSave};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::carrier::TrackEvent;
    use crate::queue::{BatchId, QueuedTrack, TrackSource, UserId};

    /// An event with a fixed timestamp.
    pub fn track_event(description: &str) -> TrackEvent {
        TrackEvent::new(
            description,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }

    /// A manually submitted job for store 1.
    pub fn queued_track(track_number: &str, user_id: UserId, batch_id: BatchId) -> QueuedTrack {
        QueuedTrack::new(track_number, 1, user_id, batch_id, TrackSource::Manual)
    }
}
