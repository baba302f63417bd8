//! Prometheus metrics for the tournament floor.
//!
//! Metrics are exposed in Prometheus text format when `METRICS_BIND` is set.
//!
//! # Metrics Categories
//!
//! - **Admin commands**: count by command and outcome
//! - **Clock**: scheduler passes, level advances, finished tournaments
//! - **Events**: every published event by name (covers rebalancing instructions)
//! - **WebSocket**: connected watchers
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pf_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::admin_commands_total("pause", "ok");
//! metrics::websocket_watchers_active(3);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use poker_floor::{
    TournamentEvent,
    notify::{NotificationHub, Notifier},
    tournament::TickReport,
};
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Admin Metrics
// ============================================================================

pub fn admin_commands_total(command: &str, outcome: &str) {
    metrics::counter!("admin_commands_total",
        "command" => command.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Clock Metrics
// ============================================================================

/// Record one scheduler pass
pub fn clock_pass(report: &TickReport) {
    metrics::counter!("clock_passes_total").increment(1);
    metrics::counter!("clock_ticks_total").increment(report.ticked as u64);
    metrics::counter!("clock_level_advances_total").increment(report.advanced as u64);
    metrics::counter!("clock_tournaments_finished_total").increment(report.finished as u64);
    metrics::counter!("clock_tick_failures_total").increment(report.failed as u64);
}

// ============================================================================
// Event Metrics
// ============================================================================

pub fn tournament_events_total(event: &'static str) {
    metrics::counter!("tournament_events_total", "event" => event).increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

pub fn websocket_watchers_active(count: usize) {
    metrics::gauge!("websocket_watchers_active").set(count as f64);
}

pub fn websocket_connections_total(role: &str) {
    metrics::counter!("websocket_connections_total", "role" => role.to_string()).increment(1);
}

/// Hub wrapper counting every event on its way out
#[derive(Debug, Clone)]
pub struct MeteredNotifier {
    hub: NotificationHub,
}

impl MeteredNotifier {
    pub fn new(hub: NotificationHub) -> Self {
        Self { hub }
    }
}

impl Notifier for MeteredNotifier {
    fn publish(&self, code: &str, event: TournamentEvent) {
        tournament_events_total(event.name());
        self.hub.publish(code, event);
    }
}
