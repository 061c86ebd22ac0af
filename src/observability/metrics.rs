//! Metrics collection and exposition.
//!
//! # Metrics
//! - `player_data_requests_total` (counter): requests by method, status
//! - `player_data_handler_faults_total` (counter): faults seen by the observer
//! - `player_data_handler_faults_dropped_total` (counter): faults that never
//!   reached the observer (channel full or closed)
//! - `player_data_controller_state` (gauge): 0=starting 1=active
//!   2=shutting_down 3=stopped 4=failed

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "player_data_requests_total";
pub const HANDLER_FAULTS_TOTAL: &str = "player_data_handler_faults_total";
pub const HANDLER_FAULTS_DROPPED_TOTAL: &str = "player_data_handler_faults_dropped_total";
pub const CONTROLLER_STATE: &str = "player_data_controller_state";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_fault_observed() {
    metrics::counter!(HANDLER_FAULTS_TOTAL).increment(1);
}

pub fn record_fault_dropped() {
    metrics::counter!(HANDLER_FAULTS_DROPPED_TOTAL).increment(1);
}

pub fn record_controller_state(code: f64) {
    metrics::gauge!(CONTROLLER_STATE).set(code);
}
