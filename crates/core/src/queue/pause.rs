//! Global pause window.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Process-wide "do not dequeue before" instant, stored as epoch millis.
///
/// Zero means never paused. Only the consumer writes it.
#[derive(Debug, Default)]
pub struct PauseGate {
    until_ms: AtomicI64,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pause deadline, if one was ever set.
    pub fn pause_until(&self) -> Option<DateTime<Utc>> {
        match self.until_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(to_datetime(ms)),
        }
    }

    /// Returns the deadline when `now` is still inside the pause window.
    pub fn paused_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let until_ms = self.until_ms.load(Ordering::SeqCst);
        (now.timestamp_millis() < until_ms).then(|| to_datetime(until_ms))
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at(Utc::now()).is_some()
    }

    /// Pauses until `now + cooldown`. A later deadline already in place is
    /// kept.
    pub fn trip(&self, now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
        let cooldown_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
        let until_ms = now
            .timestamp_millis()
            .saturating_add(cooldown_ms)
            .min(DateTime::<Utc>::MAX_UTC.timestamp_millis());
        let previous = self.until_ms.fetch_max(until_ms, Ordering::SeqCst);
        to_datetime(previous.max(until_ms))
    }
}

/// Deadlines are clamped on write, so this only falls back for corrupt values.
fn to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
