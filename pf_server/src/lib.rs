//! # pf_server
//!
//! HTTP and WebSocket front for the `poker_floor` tournament engine.
//!
//! - [`api`]: REST routes for every floor command plus the live event feed
//! - [`config`]: environment and command line configuration
//! - [`logging`]: tracing subscriber setup and structured helpers
//! - [`metrics`]: Prometheus exporter and recorders

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
