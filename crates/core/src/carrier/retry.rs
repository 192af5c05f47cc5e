//! Bounded fixed-delay retry over a single-attempt page scraper.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::session::Session;

use super::config::CarrierConfig;
use super::error::ScrapeError;
use super::traits::{CarrierScrapeClient, PageScraper};
use super::types::{PageState, TrackEvent};

/// How many times a lookup is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &CarrierConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CarrierConfig::default())
    }
}

/// [`CarrierScrapeClient`] that retries a [`PageScraper`].
///
/// - `Events` ends the loop with the events.
/// - `NoData` and `RateLimited` end the loop early with an empty result.
/// - `NotReady` and errors are retried after the fixed delay; once attempts
///   run out the last error is returned, or `PageLoad` if the page simply
///   never showed a result.
pub struct RetryingScrapeClient<P> {
    scraper: P,
    policy: RetryPolicy,
}

impl<P> RetryingScrapeClient<P> {
    pub fn new(scraper: P, policy: RetryPolicy) -> Self {
        Self { scraper, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S, P> CarrierScrapeClient<S> for RetryingScrapeClient<P>
where
    S: Session,
    P: PageScraper<S>,
{
    async fn parse_single_track(
        &self,
        session: &mut S,
        track_number: &str,
    ) -> Result<Vec<TrackEvent>, ScrapeError> {
        let attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.scraper.scrape_page(session, track_number).await {
                Ok(PageState::Events(events)) => return Ok(events),
                Ok(PageState::NoData) => {
                    debug!("Carrier has no data yet for {}", track_number);
                    return Ok(Vec::new());
                }
                Ok(PageState::RateLimited) => {
                    warn!("Carrier rate limited lookup of {}", track_number);
                    return Ok(Vec::new());
                }
                Ok(PageState::NotReady) => {
                    debug!(
                        "Result for {} not loaded (attempt {}/{})",
                        track_number, attempt, attempts
                    );
                    last_error = None;
                }
                Err(e) => {
                    warn!(
                        "Lookup of {} failed (attempt {}/{}): {}",
                        track_number, attempt, attempts, e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        Err(last_error.unwrap_or(ScrapeError::PageLoad { attempts }))
    }
}
