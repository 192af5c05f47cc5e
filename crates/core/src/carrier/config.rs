//! Carrier endpoint and retry configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the carrier scrape client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Base URL of the tracking page; the tracking number is appended as a
    /// path segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional API key sent with every lookup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Attempts per tracking number before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds).
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:9200/track".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000 // 2 seconds
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CarrierConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay_ms, 2000);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            base_url = "https://carrier.example/track/"
            api_key = "k"
            max_attempts = 5
            retry_delay_ms = 100
        "#;
        let config: CarrierConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "https://carrier.example/track/");
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay_ms, 100);
    }
}
