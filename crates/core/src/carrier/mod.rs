//! Boundary to the carrier tracking site.
//!
//! The queue consumer only sees [`CarrierScrapeClient`]: given a borrowed
//! session and a tracking number it yields zero or more dated events, or an
//! error. [`RetryingScrapeClient`] layers the bounded retry policy over a
//! single-attempt [`PageScraper`], which is where carrier-specific page
//! handling lives.

mod config;
mod error;
mod http;
mod retry;
mod traits;
mod types;

pub use config::CarrierConfig;
pub use error::ScrapeError;
pub use http::HttpPageScraper;
pub use retry::{RetryPolicy, RetryingScrapeClient};
pub use traits::{CarrierScrapeClient, PageScraper};
pub use types::{PageState, TrackEvent};
