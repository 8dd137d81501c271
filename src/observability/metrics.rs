//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, rejections, circuit state)
//! - Expose a Prometheus-compatible metrics endpoint
//! - Track per-service and aggregate metrics
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): rejections by tier, route class
//! - `gateway_retries_total` (counter): retry attempts by service
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Metric updates are atomic increments; safe on the request path
//! - Exporter failure is logged, never fatal; the gateway runs without it

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::RouteClass;
use crate::resilience::circuit_breaker::CircuitStatus;
use crate::security::identity::Tier;

/// Install the Prometheus exporter with its scrape endpoint on `addr`.
///
/// Failure to bind is logged and swallowed; metric macros degrade to no-ops
/// without an installed recorder.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(err) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %err, address = %addr, "Failed to install metrics exporter");
    }
}

/// Record one completed inbound request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string(),
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a request rejected by the rate limiter.
///
/// Labels are the tier and route class, never the client key: per-client
/// labels have unbounded cardinality.
pub fn record_rate_limited(tier: Tier, class: RouteClass) {
    metrics::counter!(
        "gateway_rate_limited_total",
        "tier" => tier.to_string(),
        "class" => class.to_string(),
    )
    .increment(1);
}

/// Record one retry attempt against a downstream.
pub fn record_retry(service: &str) {
    metrics::counter!(
        "gateway_retries_total",
        "service" => service.to_string(),
    )
    .increment(1);
}

/// Record a circuit state transition as a gauge per service.
pub fn record_circuit_state(service: &str, status: CircuitStatus) {
    let value = match status {
        CircuitStatus::Closed => 0.0,
        CircuitStatus::HalfOpen => 1.0,
        CircuitStatus::Open => 2.0,
    };
    metrics::gauge!(
        "gateway_circuit_state",
        "service" => service.to_string(),
    )
    .set(value);
}
