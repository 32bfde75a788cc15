//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_config_fetch_total` (counter): fetch attempts by outcome
//! - `gateway_config_fetch_duration_seconds` (histogram)
//! - `gateway_sync_mode` (gauge): 0=CONNECTED, 1=DEGRADED, 2=OFFLINE
//! - `gateway_sync_consecutive_failures` (gauge)
//! - `gateway_sync_mode_transitions_total` (counter): by from/to
//! - `gateway_snapshot_version` (gauge): active snapshot version
//! - `gateway_snapshot_commits_total` (counter): applied/stale
//! - `gateway_backup_writes_total` (counter): ok/error
//! - `gateway_requests_total` (counter): by route, status class
//! - `gateway_request_duration_seconds` (histogram): by route
//! - `gateway_backend_errors_total` (counter): by route, kind
//!
//! # Design Decisions
//! - `metrics` facade: every call is a no-op until a recorder is installed,
//!   so library code and tests never need a registry
//! - Prometheus exporter serves its own scrape listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::sync::state::SyncMode;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_fetch(outcome: &'static str, started: Instant) {
    counter!("gateway_config_fetch_total", "outcome" => outcome).increment(1);
    histogram!("gateway_config_fetch_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_sync_state(mode: SyncMode, consecutive_failures: u32) {
    gauge!("gateway_sync_mode").set(mode.gauge_value());
    gauge!("gateway_sync_consecutive_failures").set(consecutive_failures as f64);
}

pub fn record_mode_transition(from: SyncMode, to: SyncMode) {
    counter!(
        "gateway_sync_mode_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_snapshot_version(version: u64) {
    gauge!("gateway_snapshot_version").set(version as f64);
}

pub fn record_commit(result: &'static str) {
    counter!("gateway_snapshot_commits_total", "result" => result).increment(1);
}

pub fn record_backup_write(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("gateway_backup_writes_total", "result" => result).increment(1);
}

pub fn record_request(route: &str, status: u16, started: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status_class" => status_class(status)
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_backend_error(route: &str, kind: &'static str) {
    counter!(
        "gateway_backend_errors_total",
        "route" => route.to_string(),
        "kind" => kind
    )
    .increment(1);
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
