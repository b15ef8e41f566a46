//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): responses by route and status
//! - `proxy_request_duration_seconds` (histogram): time to first response byte
//! - `proxy_upstream_retries_total` (counter): re-issued upstream attempts
//! - `proxy_rejected_total` (counter): targets refused by the URL policy
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and the
//!   CLI never need to set one up
//! - Labels are limited to route and status code to keep cardinality flat

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry() {
    metrics::counter!("proxy_upstream_retries_total").increment(1);
}

pub fn record_rejected() {
    metrics::counter!("proxy_rejected_total").increment(1);
}
