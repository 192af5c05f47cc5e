//! Mock track persistence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::carrier::TrackEvent;
use crate::queue::{StoreId, UserId};
use crate::track_store::{TrackProcessingService, TrackStoreError};

/// A recorded `save` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSave {
    pub track_number: String,
    pub events: Vec<TrackEvent>,
    pub store_id: StoreId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct MockTrackService {
    saves: Arc<Mutex<Vec<RecordedSave>>>,
    fail: Arc<AtomicBool>,
}

impl MockTrackService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `save` fail with a database error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> Vec<RecordedSave> {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TrackProcessingService for MockTrackService {
    fn save(
        &self,
        track_number: &str,
        events: &[TrackEvent],
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<(), TrackStoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TrackStoreError::Database("mock database failure".to_string()));
        }
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedSave {
                track_number: track_number.to_string(),
                events: events.to_vec(),
                store_id,
                user_id,
            });
        Ok(())
    }
}
