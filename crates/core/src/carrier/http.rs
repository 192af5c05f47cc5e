//! Page scraper for carriers exposing their tracking page as JSON.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::session::{HttpSession, Session};

use super::config::CarrierConfig;
use super::error::ScrapeError;
use super::traits::PageScraper;
use super::types::{PageState, TrackEvent};

/// Header carrying the carrier API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Tracking page body as served by the carrier.
#[derive(Debug, Deserialize)]
struct TrackingPage {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    events: Vec<TrackEvent>,
}

impl TrackingPage {
    fn into_state(self) -> PageState {
        if !self.events.is_empty() {
            return PageState::Events(self.events);
        }
        match self.status.as_deref() {
            Some("rate_limited") => PageState::RateLimited,
            Some("loading") | Some("pending") => PageState::NotReady,
            _ => PageState::NoData,
        }
    }
}

/// Loads `{base_url}/{track_number}` with the session's HTTP client.
#[derive(Debug, Clone)]
pub struct HttpPageScraper {
    base_url: String,
    api_key: Option<String>,
}

impl HttpPageScraper {
    pub fn new(config: &CarrierConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn track_url(&self, track_number: &str) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(track_number.trim())
        )
    }
}

#[async_trait]
impl PageScraper<HttpSession> for HttpPageScraper {
    async fn scrape_page(
        &self,
        session: &mut HttpSession,
        track_number: &str,
    ) -> Result<PageState, ScrapeError> {
        if session.is_closed() {
            return Err(ScrapeError::Session(format!(
                "session {} is closed",
                session.id()
            )));
        }

        let mut request = session.client().get(self.track_url(track_number));
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(PageState::NoData);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(PageState::RateLimited);
        }
        if status.is_server_error() {
            return Ok(PageState::NotReady);
        }
        if !status.is_success() {
            return Err(ScrapeError::Other(format!(
                "carrier answered {} for {}",
                status, track_number
            )));
        }

        // A body that does not parse is a page that has not rendered yet.
        match response.json::<TrackingPage>().await {
            Ok(page) => Ok(page.into_state()),
            Err(e) => {
                tracing::debug!("Unparseable tracking page for {}: {}", track_number, e);
                Ok(PageState::NotReady)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> PageState {
        serde_json::from_str::<TrackingPage>(json)
            .unwrap()
            .into_state()
    }

    #[test]
    fn test_track_url_encodes_number() {
        let scraper = HttpPageScraper::new(&CarrierConfig {
            base_url: "https://carrier.example/track/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            scraper.track_url(" RR 123/45 "),
            "https://carrier.example/track/RR%20123%2F45"
        );
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let scraper = HttpPageScraper::new(&CarrierConfig {
            api_key: Some(String::new()),
            ..Default::default()
        });
        assert!(scraper.api_key.is_none());
    }

    #[test]
    fn test_page_with_events() {
        let state = parse(
            r#"{"events":[{"occurred_at":"2024-03-01T10:00:00Z","description":"Accepted"}]}"#,
        );
        match state {
            PageState::Events(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].description, "Accepted");
            }
            other => panic!("Expected events, got {:?}", other),
        }
    }

    #[test]
    fn test_page_terminal_states() {
        assert_eq!(parse(r#"{"status":"rate_limited"}"#), PageState::RateLimited);
        assert_eq!(parse(r#"{"status":"not_found"}"#), PageState::NoData);
        assert_eq!(parse(r#"{"events":[]}"#), PageState::NoData);
        assert_eq!(parse(r#"{"status":"loading"}"#), PageState::NotReady);
    }
}
