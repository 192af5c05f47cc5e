use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::carrier::CarrierConfig;
use crate::queue::QueueConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session_pool: SessionPoolConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub carrier: CarrierConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("parcelwatch.db")
}

/// Session pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionPoolConfig {
    /// Number of sessions created at startup.
    #[serde(default = "default_pool_size")]
    pub size: usize,
    /// User agent presented to the carrier site.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SessionPoolConfig {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_pool_size() -> usize {
    2
}

fn default_user_agent() -> String {
    concat!("parcelwatch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session_pool: SessionPoolConfig,
    pub queue: QueueConfig,
    pub carrier: SanitizedCarrierConfig,
}

/// Sanitized carrier config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCarrierConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            session_pool: config.session_pool.clone(),
            queue: config.queue.clone(),
            carrier: SanitizedCarrierConfig {
                base_url: config.carrier.base_url.clone(),
                api_key_configured: config
                    .carrier
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                max_attempts: config.carrier.max_attempts,
                retry_delay_ms: config.carrier.retry_delay_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "parcelwatch.db");
        assert_eq!(config.session_pool.size, 2);
        assert_eq!(config.session_pool.request_timeout_secs, 30);
        assert_eq!(config.queue.pause_cooldown_secs, 60);
        assert_eq!(config.carrier.max_attempts, 3);
    }

    #[test]
    fn test_deserialize_server_section() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_pool_and_queue_sections() {
        let toml = r#"
[session_pool]
size = 4
user_agent = "test-agent"

[queue]
tick_interval_ms = 250
pause_cooldown_secs = 120

[carrier]
base_url = "https://carrier.example/track"
retry_delay_ms = 500
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.session_pool.size, 4);
        assert_eq!(config.session_pool.user_agent, "test-agent");
        assert_eq!(config.queue.tick_interval_ms, 250);
        assert_eq!(config.queue.pause_cooldown_secs, 120);
        assert_eq!(config.carrier.base_url, "https://carrier.example/track");
        assert_eq!(config.carrier.retry_delay_ms, 500);
        assert_eq!(config.carrier.max_attempts, 3);
    }

    #[test]
    fn test_deserialize_with_custom_database_path() {
        let toml = r#"
[database]
path = "/data/tracks.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "/data/tracks.sqlite");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let mut config = Config::default();
        config.carrier.api_key = Some("secret-key".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.carrier.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn test_sanitized_config_without_api_key() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(!sanitized.carrier.api_key_configured);
        assert_eq!(sanitized.server.port, 8080);
    }
}
