//! Persistence of scraped tracking results.

mod sqlite;

pub use sqlite::SqliteTrackStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::carrier::TrackEvent;
use crate::queue::{StoreId, UserId};

#[derive(Debug, Error)]
pub enum TrackStoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("nothing to save for track {0}")]
    NoEvents(String),
}

impl From<rusqlite::Error> for TrackStoreError {
    fn from(err: rusqlite::Error) -> Self {
        TrackStoreError::Database(err.to_string())
    }
}

/// Latest known state of a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    pub track_number: String,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub last_status: String,
    pub last_event_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stores the events found for a track.
///
/// Events are given newest first; the first one becomes the track's current
/// status. Saving the same event twice is a no-op.
pub trait TrackProcessingService: Send + Sync {
    fn save(
        &self,
        track_number: &str,
        events: &[TrackEvent],
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<(), TrackStoreError>;
}
