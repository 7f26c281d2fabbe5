//! Prometheus metrics for pipeline observability.
//!
//! Metrics are exposed via a dedicated HTTP listener when `METRICS_PORT` is set.
//! Recording functions are no-ops until an exporter is installed, so stages
//! call them unconditionally.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `pipeline_requests_total` - Completed requests (label: status_class)
//! - `pipeline_rate_limit_rejections_total` - Requests rejected with 429
//! - `pipeline_redirects_total` - Redirects issued (label: kind = https | canonical)
//! - `pipeline_host_rejections_total` - Requests rejected by the Host allow-list
//!
//! ## Histograms
//! - `pipeline_request_duration_seconds` - Request duration (labels: method, status_class)

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "pipeline_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "pipeline_request_duration_seconds";
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "pipeline_rate_limit_rejections_total";
    pub const REDIRECTS_TOTAL: &str = "pipeline_redirects_total";
    pub const HOST_REJECTIONS_TOTAL: &str = "pipeline_host_rejections_total";
}

/// Kind label for [`record_redirect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Https,
    Canonical,
}

impl RedirectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectKind::Https => "https",
            RedirectKind::Canonical => "canonical",
        }
    }
}

/// Install the Prometheus exporter and describe every metric.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (for example when
/// the listener address is already in use or a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_TOTAL,
        "Total number of requests that completed the pipeline"
    );
    describe_counter!(
        names::RATE_LIMIT_REJECTIONS_TOTAL,
        "Total number of requests rejected by rate limiting"
    );
    describe_counter!(
        names::REDIRECTS_TOTAL,
        "Total number of HTTPS and canonical-host redirects"
    );
    describe_counter!(
        names::HOST_REJECTIONS_TOTAL,
        "Total number of requests rejected by host validation"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Time spent inside the pipeline in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Bucket a status code into `1xx`..`5xx`.
pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: StatusCode, duration_secs: f64) {
    let class = status_class(status);
    counter!(names::REQUESTS_TOTAL, "status_class" => class).increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method.to_string(), "status_class" => class)
        .record(duration_secs);
}

pub fn record_rate_limit_rejection() {
    counter!(names::RATE_LIMIT_REJECTIONS_TOTAL).increment(1);
}

pub fn record_redirect(kind: RedirectKind) {
    counter!(names::REDIRECTS_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn record_host_rejection() {
    counter!(names::HOST_REJECTIONS_TOTAL).increment(1);
}
