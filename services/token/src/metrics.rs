//! Prometheus metrics for the token rotation service.
//!
//! Provides counters and histograms for observability.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Token pairs issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_tokens_issued_total",
        "Total number of token pairs issued",
        &["status"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Refresh outcomes counter.
pub static TOKENS_REFRESHED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_tokens_refreshed_total",
        "Total number of refresh attempts by outcome",
        &["status"]
    )
    .expect("Failed to register tokens_refreshed metric")
});

/// Origin change warnings counter.
pub static ORIGIN_WARNINGS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_origin_warnings_total",
        "Total number of owner warnings for unrecognized origins",
        &["notifier", "status"]
    )
    .expect("Failed to register origin_warnings metric")
});

/// HTTP route latency histogram.
pub static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "token_rotation_http_latency_seconds",
        "HTTP route latency in seconds",
        &["route", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_latency metric")
});

/// Record an issue outcome (`ok` or an error code).
pub fn record_token_issued(status: &str) {
    TOKENS_ISSUED.with_label_values(&[status]).inc();
}

/// Record a refresh outcome (`ok` or an error code).
pub fn record_token_refreshed(status: &str) {
    TOKENS_REFRESHED.with_label_values(&[status]).inc();
}

/// Record an owner warning delivery attempt.
pub fn record_origin_warning(notifier: &str, status: &str) {
    ORIGIN_WARNINGS
        .with_label_values(&[notifier, status])
        .inc();
}

/// Record HTTP route latency.
pub fn record_http_latency(route: &str, status: u16, duration_secs: f64) {
    HTTP_LATENCY
        .with_label_values(&[route, &status.to_string()])
        .observe(duration_secs);
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
