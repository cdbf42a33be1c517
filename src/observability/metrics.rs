//! Metrics collection and exposition.
//!
//! # Metrics
//! - `build_watch_reloads_total` (counter): config reloads by outcome
//! - `build_watch_sessions_started_total` (counter): watch sessions started
//! - `build_watch_build_duration_seconds` (histogram): successful build durations
//! - `build_watch_build_errors_total` (counter): failed builds
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Reload outcome label values.
pub mod outcome {
    pub const APPLIED: &str = "applied";
    pub const FAILED: &str = "failed";
    pub const SUPERSEDED: &str = "superseded";
}

/// Serve Prometheus metrics on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_reload(outcome: &'static str) {
    ::metrics::counter!("build_watch_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_session_started() {
    ::metrics::counter!("build_watch_sessions_started_total").increment(1);
}

pub fn record_build(duration: Duration) {
    ::metrics::histogram!("build_watch_build_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_build_error() {
    ::metrics::counter!("build_watch_build_errors_total").increment(1);
}
