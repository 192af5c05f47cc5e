//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the parcelwatch server:
//! - HTTP request metrics (latency, counts, errors)
//! - WebSocket connection metrics
//! - Queue and session pool status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "parcelwatch_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelwatch_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "parcelwatch_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "parcelwatch_ws_messages_sent_total",
            "WebSocket messages sent",
        ),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "parcelwatch_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics (collected dynamically)
// =============================================================================

/// Jobs waiting in the processing queue.
pub static QUEUE_LENGTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("parcelwatch_queue_length", "Jobs waiting in the queue").unwrap()
});

/// Whether dequeuing is paused after a carrier fault (1 = paused).
pub static QUEUE_PAUSED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_queue_paused",
        "Whether the queue is paused (1) or draining (0)",
    )
    .unwrap()
});

/// Consumer running state (1 = running, 0 = stopped).
pub static QUEUE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_queue_running",
        "Whether the queue consumer is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Batches with unprocessed jobs.
pub static ACTIVE_BATCHES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_active_batches",
        "Number of batches still being processed",
    )
    .unwrap()
});

// =============================================================================
// Session Pool Metrics (collected dynamically)
// =============================================================================

/// Idle sessions.
pub static SESSIONS_IDLE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("parcelwatch_sessions_idle", "Sessions waiting in the pool").unwrap()
});

/// Sessions lent out.
pub static SESSIONS_IN_USE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_sessions_in_use",
        "Sessions currently borrowed from the pool",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Queue
    registry.register(Box::new(QUEUE_LENGTH.clone())).unwrap();
    registry.register(Box::new(QUEUE_PAUSED.clone())).unwrap();
    registry.register(Box::new(QUEUE_RUNNING.clone())).unwrap();
    registry
        .register(Box::new(ACTIVE_BATCHES.clone()))
        .unwrap();

    // Session pool
    registry.register(Box::new(SESSIONS_IDLE.clone())).unwrap();
    registry
        .register(Box::new(SESSIONS_IN_USE.clone()))
        .unwrap();

    // Core metrics (queue intake, outcomes, scrape latency)
    for metric in parcelwatch_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the queue and pool as they
/// are right now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let queue = state.queue().status();
    QUEUE_LENGTH.set(queue.queue_len as i64);
    QUEUE_PAUSED.set(i64::from(queue.paused));
    QUEUE_RUNNING.set(i64::from(queue.running));
    ACTIVE_BATCHES.set(queue.active_batches as i64);

    let pool = state.pool().status();
    SESSIONS_IDLE.set(pool.idle as i64);
    SESSIONS_IN_USE.set(pool.in_use as i64);
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());
static TRACK_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/tracks/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = TRACK_SEGMENT.replace_all(path, "/tracks/{number}");
    // Twice, so adjacent numeric segments both get replaced.
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/batches/12345"), "/api/v1/batches/{id}");
        assert_eq!(
            normalize_path("/api/v1/batches/12345/wait"),
            "/api/v1/batches/{id}/wait"
        );
    }

    #[test]
    fn test_normalize_path_track_number() {
        assert_eq!(
            normalize_path("/api/v1/tracks/RR123456789PL"),
            "/api/v1/tracks/{number}"
        );
        // The collection route itself is untouched.
        assert_eq!(normalize_path("/api/v1/tracks"), "/api/v1/tracks");
    }

    #[test]
    fn test_normalize_path_adjacent_ids() {
        assert_eq!(normalize_path("/a/1/2"), "/a/{id}/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("parcelwatch_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_queue_and_pool_metrics() {
        QUEUE_LENGTH.set(0);
        QUEUE_PAUSED.set(0);
        SESSIONS_IDLE.set(2);
        SESSIONS_IN_USE.set(0);
        parcelwatch_core::metrics::PAUSE_TRIPS.inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("parcelwatch_queue_length"));
        assert!(output.contains("parcelwatch_queue_paused"));
        assert!(output.contains("parcelwatch_sessions_idle"));
        assert!(output.contains("parcelwatch_sessions_in_use"));
        assert!(output.contains("parcelwatch_pause_trips_total"));
    }
}
