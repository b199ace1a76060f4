//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by dispatch kind and status
//! - `proxy_request_duration_seconds` (histogram): time to response headers
//! - `proxy_upstream_failures_total` (counter): proxy-side failures by kind
//! - `proxy_websocket_sessions_active` (gauge): spliced sessions in flight
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Prometheus export only when an address is configured

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(kind: &'static str, status: u16, start: Instant) {
    counter!("proxy_requests_total", "kind" => kind, "status" => status.to_string()).increment(1);
    histogram!("proxy_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// Record a failure the proxy mapped to an error response.
pub fn record_failure(kind: &'static str) {
    counter!("proxy_upstream_failures_total", "kind" => kind).increment(1);
}

/// Publish the current number of spliced WebSocket sessions.
pub fn record_active_sessions(count: u64) {
    gauge!("proxy_websocket_sessions_active").set(count as f64);
}
