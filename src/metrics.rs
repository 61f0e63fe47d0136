//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP endpoint (default port 9090).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `manga_api_requests_total` - Total HTTP requests (labels: endpoint, method, status)
//! - `manga_api_rate_limit_rejections_total` - Requests rejected by the rate limiter
//! - `manga_api_edit_conflicts_total` - Optimistic-concurrency update conflicts
//! - `manga_api_auth_failures_total` - Failed authentication attempts (label: reason)
//!
//! ## Histograms
//! - `manga_api_request_duration_seconds` - Request duration (labels: endpoint, method, status)

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "manga_api_requests_total";
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "manga_api_rate_limit_rejections_total";
    pub const EDIT_CONFLICTS_TOTAL: &str = "manga_api_edit_conflicts_total";
    pub const AUTH_FAILURES_TOTAL: &str = "manga_api_auth_failures_total";
    pub const REQUEST_DURATION_SECONDS: &str = "manga_api_request_duration_seconds";
}

/// Start the Prometheus HTTP listener and register metric descriptions.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("could not install Prometheus exporter: {e}"))?;

    describe_counter!(names::REQUESTS_TOTAL, "Total number of HTTP requests");
    describe_counter!(
        names::RATE_LIMIT_REJECTIONS_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(
        names::EDIT_CONFLICTS_TOTAL,
        "Total number of updates rejected due to an edit conflict"
    );
    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total number of failed authentication attempts"
    );

    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Best-effort initialization; the API keeps serving without an exporter.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Metrics exporter unavailable, continuing without it");
    }
}

/// Record a completed HTTP request with its duration.
pub fn record_request(endpoint: &str, method: &str, status: &str, duration_secs: f64) {
    counter!(names::REQUESTS_TOTAL, "endpoint" => endpoint.to_string(), "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "endpoint" => endpoint.to_string(), "method" => method.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limit_rejection() {
    counter!(names::RATE_LIMIT_REJECTIONS_TOTAL).increment(1);
}

/// Record an update lost to a concurrent writer.
pub fn record_edit_conflict() {
    counter!(names::EDIT_CONFLICTS_TOTAL).increment(1);
}

/// Record a failed authentication attempt.
pub fn record_auth_failure(reason: &str) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests verify the recording functions don't panic when no
    // exporter is installed.

    #[test]
    fn test_record_request() {
        record_request("/v1/mangas", "POST", "201", 0.05);
    }

    #[test]
    fn test_record_rate_limit_rejection() {
        record_rate_limit_rejection();
    }

    #[test]
    fn test_record_edit_conflict() {
        record_edit_conflict();
    }

    #[test]
    fn test_record_auth_failure() {
        record_auth_failure("invalid_token");
    }
}
