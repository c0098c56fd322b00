//! Prometheus metrics for costing-engine.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Engine recomputations by engine and trigger.
pub static RECOMPUTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "costing_recomputations_total",
        "Total number of engine recomputations",
        &["engine", "trigger"]
    )
    .expect("Failed to register RECOMPUTATIONS")
});

/// Backend requests by operation and outcome.
pub static BACKEND_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "costing_backend_requests_total",
        "Total number of backend requests",
        &["operation", "status"]
    )
    .expect("Failed to register BACKEND_REQUESTS")
});

pub static BACKEND_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "costing_backend_request_duration_seconds",
        "Backend request duration in seconds",
        &["operation"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register BACKEND_REQUEST_DURATION")
});

/// Submitted settlements and formulations by kind and outcome.
pub static SUBMISSIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "costing_submissions_total",
        "Total number of submissions",
        &["kind", "status"]
    )
    .expect("Failed to register SUBMISSIONS")
});

/// Receipt edits reduced below the requested value.
pub static CLAMP_WARNINGS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "costing_clamp_warnings_total",
        "Total number of clamped allocation edits",
        &["kind"]
    )
    .expect("Failed to register CLAMP_WARNINGS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&RECOMPUTATIONS);
    Lazy::force(&BACKEND_REQUESTS);
    Lazy::force(&BACKEND_REQUEST_DURATION);
    Lazy::force(&SUBMISSIONS);
    Lazy::force(&CLAMP_WARNINGS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_recomputation(engine: &str, trigger: &str) {
    RECOMPUTATIONS.with_label_values(&[engine, trigger]).inc();
}

pub fn record_backend_request(operation: &str, status: &str, duration_secs: f64) {
    BACKEND_REQUESTS.with_label_values(&[operation, status]).inc();
    BACKEND_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

pub fn record_submission(kind: &str, status: &str) {
    SUBMISSIONS.with_label_values(&[kind, status]).inc();
}

pub fn record_clamp_warning(kind: &str) {
    CLAMP_WARNINGS.with_label_values(&[kind]).inc();
}
