//! Mock carrier scrape client.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::carrier::{CarrierScrapeClient, ScrapeError, TrackEvent};
use crate::session::Session;

/// One recorded `parse_single_track` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedScrape {
    pub session_id: String,
    pub track_number: String,
}

/// Scripted scrape client.
///
/// Results are looked up by track number, falling back to the default
/// result (one "Delivered" event unless changed). `set_next_error` overrides
/// the next call only.
#[derive(Debug, Clone)]
pub struct MockScrapeClient {
    calls: Arc<RwLock<Vec<RecordedScrape>>>,
    results: Arc<RwLock<HashMap<String, Result<Vec<TrackEvent>, ScrapeError>>>>,
    default_result: Arc<RwLock<Result<Vec<TrackEvent>, ScrapeError>>>,
    next_error: Arc<RwLock<Option<ScrapeError>>>,
    panic_on: Arc<RwLock<HashSet<String>>>,
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockScrapeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScrapeClient {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            default_result: Arc::new(RwLock::new(Ok(vec![super::fixtures::track_event(
                "Delivered",
            )]))),
            next_error: Arc::new(RwLock::new(None)),
            panic_on: Arc::new(RwLock::new(HashSet::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Script the result for one track number.
    pub async fn set_result(
        &self,
        track_number: &str,
        result: Result<Vec<TrackEvent>, ScrapeError>,
    ) {
        self.results
            .write()
            .await
            .insert(track_number.to_string(), result);
    }

    /// Result for track numbers without a scripted one.
    pub async fn set_default_result(&self, result: Result<Vec<TrackEvent>, ScrapeError>) {
        *self.default_result.write().await = result;
    }

    /// Fail the next call with this error.
    pub async fn set_next_error(&self, error: ScrapeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Panic when asked for this track number.
    pub async fn panic_on(&self, track_number: &str) {
        self.panic_on.write().await.insert(track_number.to_string());
    }

    /// Sleep this long inside every call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedScrape> {
        self.calls.read().await.clone()
    }

    /// Track numbers in the order they were scraped.
    pub async fn scraped_numbers(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .map(|c| c.track_number.clone())
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl<S: Session> CarrierScrapeClient<S> for MockScrapeClient {
    async fn parse_single_track(
        &self,
        session: &mut S,
        track_number: &str,
    ) -> Result<Vec<TrackEvent>, ScrapeError> {
        self.calls.write().await.push(RecordedScrape {
            session_id: session.id().to_string(),
            track_number: track_number.to_string(),
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.panic_on.read().await.contains(track_number) {
            panic!("mock scrape client panicked on {}", track_number);
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(result) = self.results.read().await.get(track_number) {
            return result.clone();
        }
        self.default_result.read().await.clone()
    }
}
