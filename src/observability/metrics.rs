//! Metrics collection and exposition.
//!
//! # Metrics
//! - `crs_proxy_requests_total` (counter): dispatched calls by outcome
//! - `crs_proxy_request_duration_seconds` (histogram): time to response head
//! - `crs_proxy_registry_entries` (gauge): entries in the current snapshot
//! - `crs_proxy_discovery_reconciliations_total` (counter): snapshots built by discovery
//! - `crs_proxy_discovery_restarts_total` (counter): supervised feed restarts
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched call.
pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("crs_proxy_requests_total", "outcome" => outcome).increment(1);
    histogram!("crs_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_registry_size(entries: usize) {
    gauge!("crs_proxy_registry_entries").set(entries as f64);
}

pub fn record_reconciliation() {
    counter!("crs_proxy_discovery_reconciliations_total").increment(1);
}

pub fn record_discovery_restart() {
    counter!("crs_proxy_discovery_restarts_total").increment(1);
}
