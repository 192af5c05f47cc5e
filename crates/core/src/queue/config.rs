//! Processing queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the processing queue and its consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Run the background consumer.
    /// When disabled, jobs are accepted but only drained by explicit ticks.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Delay between the end of one tick and the start of the next (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// How long dequeuing stops after a carrier fault (seconds).
    #[serde(default = "default_pause_cooldown")]
    pub pause_cooldown_secs: u64,

    /// Assumed processing time per job, used for wait estimates (seconds).
    #[serde(default = "default_estimated_job")]
    pub estimated_job_secs: u64,

    /// How long `stop` waits for an in-flight tick before aborting it (seconds).
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    1000 // 1 second
}

fn default_pause_cooldown() -> u64 {
    60
}

fn default_estimated_job() -> u64 {
    10
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl QueueConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn pause_cooldown(&self) -> Duration {
        Duration::from_secs(self.pause_cooldown_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tick_interval_ms: default_tick_interval(),
            pause_cooldown_secs: default_pause_cooldown(),
            estimated_job_secs: default_estimated_job(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}
