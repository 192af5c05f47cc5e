//! Data returned by the carrier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One dated status line from the carrier's tracking history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    /// When the carrier recorded the event.
    pub occurred_at: DateTime<Utc>,
    /// Human-readable status description.
    pub description: String,
    /// Facility or city, when the carrier reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl TrackEvent {
    /// Create an event without a location.
    pub fn new(description: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            description: description.into(),
            location: None,
        }
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// What a single page load showed.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// The tracking history was rendered.
    Events(Vec<TrackEvent>),
    /// The carrier has no data for this number yet.
    NoData,
    /// The carrier refused the lookup because of rate limiting.
    RateLimited,
    /// The expected result did not appear; worth another attempt.
    NotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_event_serialization_skips_missing_location() {
        let event = TrackEvent::new("Accepted", Utc::now());
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("location"));

        let event = event.with_location("Sorting center");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"location\":\"Sorting center\""));
    }
}
