//! Trait definitions for the carrier boundary.

use async_trait::async_trait;

use crate::session::Session;

use super::error::ScrapeError;
use super::types::{PageState, TrackEvent};

/// Looks up one tracking number on the carrier site.
///
/// An empty `Ok` means the carrier showed a recognized terminal state (no
/// data yet, or rate limited). Errors are returned only once the client's own
/// retry policy is exhausted.
#[async_trait]
pub trait CarrierScrapeClient<S: Session>: Send + Sync {
    async fn parse_single_track(
        &self,
        session: &mut S,
        track_number: &str,
    ) -> Result<Vec<TrackEvent>, ScrapeError>;
}

/// Performs a single page load for a tracking number, without retrying.
#[async_trait]
pub trait PageScraper<S: Session>: Send + Sync {
    async fn scrape_page(
        &self,
        session: &mut S,
        track_number: &str,
    ) -> Result<PageState, ScrapeError>;
}
