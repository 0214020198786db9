//! Metrics collection and exposition.
//!
//! # Metrics
//! - `quote_requests_total` (counter): requests by status
//! - `quote_request_duration_seconds` (histogram): endpoint latency
//! - `quote_upstream_failures_total` (counter): fetch failures by kind
//! - `quote_persist_failures_total` (counter): write failures by kind
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("quote_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("quote_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(kind: &'static str) {
    metrics::counter!("quote_upstream_failures_total", "kind" => kind).increment(1);
}

pub fn record_persist_failure(kind: &'static str) {
    metrics::counter!("quote_persist_failures_total", "kind" => kind).increment(1);
}
