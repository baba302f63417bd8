//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use pf_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the outcome of an admin command
///
/// # Example
///
/// ```
/// use pf_server::logging::log_admin_command;
///
/// log_admin_command("A1B2C3D4", "pause", "ok", None);
/// log_admin_command("A1B2C3D4", "eliminate", "not_found", Some("Player not found: 9"));
/// ```
pub fn log_admin_command(code: &str, command: &str, outcome: &str, detail: Option<&str>) {
    if outcome == "ok" {
        tracing::info!(
            tournament = code,
            command = command,
            outcome = outcome,
            "admin command"
        );
    } else {
        tracing::warn!(
            tournament = code,
            command = command,
            outcome = outcome,
            detail = detail,
            "admin command rejected"
        );
    }
}

/// Log a watcher joining or leaving a tournament feed
pub fn log_watcher(code: &str, session_id: &str, role: &str, connected: bool) {
    tracing::info!(
        tournament = code,
        session_id = session_id,
        role = role,
        connected = connected,
        "watcher {}",
        if connected { "connected" } else { "disconnected" }
    );
}

/// Log a clock pass that changed something
pub fn log_clock_pass(ticked: usize, advanced: usize, finished: usize, failed: usize) {
    if failed > 0 {
        tracing::warn!(ticked, advanced, finished, failed, "clock pass with failures");
    } else {
        tracing::debug!(ticked, advanced, finished, "clock pass");
    }
}
