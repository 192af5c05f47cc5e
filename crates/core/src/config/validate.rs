use super::{types::Config, ConfigError};

/// Upper bound for the queue's second-based timings (one day).
const MAX_QUEUE_SECS: u64 = 86_400;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Session pool holds at least one session
/// - Carrier retry policy makes at least one attempt
/// - Carrier base URL is set
/// - Queue tick interval is non-zero
/// - Pause cooldown and per-job estimate stay within a day
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.session_pool.size == 0 {
        return Err(ConfigError::ValidationError(
            "session_pool.size must be at least 1".to_string(),
        ));
    }

    if config.carrier.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "carrier.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.carrier.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "carrier.base_url cannot be empty".to_string(),
        ));
    }

    if config.queue.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "queue.tick_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.queue.pause_cooldown_secs > MAX_QUEUE_SECS {
        return Err(ConfigError::ValidationError(format!(
            "queue.pause_cooldown_secs cannot exceed {}",
            MAX_QUEUE_SECS
        )));
    }

    if config.queue.estimated_job_secs > MAX_QUEUE_SECS {
        return Err(ConfigError::ValidationError(format!(
            "queue.estimated_job_secs cannot exceed {}",
            MAX_QUEUE_SECS
        )));
    }

    Ok(())
}
