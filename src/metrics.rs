//! Prometheus metrics for application observability.
//!
//! Metrics are exposed on a dedicated listener when `METRICS_PORT` is set.
//! Recording functions are no-ops until [`init_metrics`] installs a recorder,
//! so handlers and middleware can call them unconditionally.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `jokes_rate_limited_total` - Requests rejected by the per-IP rate limiter
//! - `jokes_auth_failures_total` - Rejected bearer authentications (label: reason)
//!
//! ## Histograms
//! - `jokes_request_duration_seconds` - Handler duration (labels: method, status)
//!
//! ## Gauges
//! - `jokes_rate_limit_tracked_clients` - Client entries held by the rate limiter

use std::net::SocketAddr;

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const RATE_LIMITED_TOTAL: &str = "jokes_rate_limited_total";
    pub const AUTH_FAILURES_TOTAL: &str = "jokes_auth_failures_total";
    pub const REQUEST_DURATION_SECONDS: &str = "jokes_request_duration_seconds";
    pub const RATE_LIMIT_TRACKED_CLIENTS: &str = "jokes_rate_limit_tracked_clients";
}

/// Initialize the Prometheus metrics exporter on `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("failed to install Prometheus exporter")?;

    describe_counter!(
        names::RATE_LIMITED_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total number of rejected bearer authentications"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Handler duration in seconds"
    );
    describe_gauge!(
        names::RATE_LIMIT_TRACKED_CLIENTS,
        "Number of client IPs currently tracked by the rate limiter"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %format!("{e:#}"), "Failed to initialize metrics, continuing without metrics");
    }
}

// =============================================================================
// Counter Recording Functions
// =============================================================================

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited() {
    counter!(names::RATE_LIMITED_TOTAL).increment(1);
}

/// Record a rejected authentication attempt.
pub fn record_auth_failure(reason: &'static str) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason).increment(1);
}

// =============================================================================
// Histogram Recording Functions
// =============================================================================

/// Record handler duration.
pub fn record_request_duration(method: &str, status: u16, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

// =============================================================================
// Gauge Recording Functions
// =============================================================================

/// Update the tracked-clients gauge.
pub fn set_tracked_clients(count: usize) {
    gauge!(names::RATE_LIMIT_TRACKED_CLIENTS).set(count as f64);
}
