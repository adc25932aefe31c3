//! Prometheus metrics for observability.
//!
//! Metrics for monitoring the coldpress server:
//! - WebSocket connection metrics
//! - Conversion job and per-file counters
//! - Active-job gauge (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "coldpress_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldpress_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// Events broadcast to WebSocket clients, by kind.
pub static WS_EVENTS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "coldpress_ws_events_sent_total",
            "Conversion events broadcast to WebSocket clients",
        ),
        &["event"],
    )
    .unwrap()
});

/// WebSocket lag events (when a client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldpress_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversion jobs started.
pub static JOBS_STARTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldpress_jobs_started_total",
        "Conversion jobs started since startup",
    )
    .unwrap()
});

/// Files converted successfully.
pub static FILES_CONVERTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldpress_files_converted_total",
        "Files converted successfully since startup",
    )
    .unwrap()
});

/// Files that failed to convert.
pub static FILES_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldpress_files_failed_total",
        "Files that failed to convert since startup",
    )
    .unwrap()
});

/// Whether a conversion job is running (1) or not (0). Collected dynamically.
pub static JOB_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "coldpress_job_active",
        "Whether a conversion job is currently running",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(WS_EVENTS_SENT.clone())).unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    registry
        .register(Box::new(JOBS_STARTED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(FILES_CONVERTED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(FILES_FAILED_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(JOB_ACTIVE.clone())).unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    JOB_ACTIVE.set(i64::from(state.runner().is_active().await));
}
