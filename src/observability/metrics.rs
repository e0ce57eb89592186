//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_decisions_total` (counter): admissions by `decision`
//!   (`allow`, `reject`, `allow_unmetered`, `unavailable`)
//! - `gatekeeper_store_errors_total` (counter): store failures by `kind`
//! - `gatekeeper_store_latency_seconds` (histogram): time spent in the store
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const DECISIONS_TOTAL: &str = "gatekeeper_decisions_total";
pub const STORE_ERRORS_TOTAL: &str = "gatekeeper_store_errors_total";
pub const STORE_LATENCY_SECONDS: &str = "gatekeeper_store_latency_seconds";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_counter!(DECISIONS_TOTAL, Unit::Count, "Rate limit decisions by outcome");
    describe_counter!(STORE_ERRORS_TOTAL, Unit::Count, "Counter store failures by kind");
    describe_histogram!(STORE_LATENCY_SECONDS, Unit::Seconds, "Counter store operation latency");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_decision(decision: &'static str) {
    counter!(DECISIONS_TOTAL, "decision" => decision).increment(1);
}

pub fn record_store_error(kind: &'static str) {
    counter!(STORE_ERRORS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_store_latency(started: Instant) {
    histogram!(STORE_LATENCY_SECONDS).record(started.elapsed().as_secs_f64());
}
