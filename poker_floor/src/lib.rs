//! # Poker Floor
//!
//! Engine for live multi-table poker tournaments: a wall-clock blind timer
//! and a seating engine that keeps active players evenly spread across tables
//! as others bust out.
//!
//! ## Architecture
//!
//! - **Clock**: blind levels advance when their duration has been spent
//!   running; pauses freeze the level.
//! - **Seating**: random initial fill, lowest-free-seat moves, table breaks
//!   and final-table consolidation.
//! - **Rebalancing**: after each elimination, decides whether to consolidate,
//!   break a short table or move one player.
//! - **Manager**: serializes every command per tournament, persists the
//!   aggregate and publishes events.
//!
//! ## Core Modules
//!
//! - [`tournament`]: domain model, algorithms and the manager
//! - [`db`]: storage backends
//! - [`notify`]: event fan-out to watchers
//! - [`scheduler`]: periodic clock driver

/// Tournament domain model, algorithms and the manager.
pub mod tournament;
pub use tournament::{
    ErrorKind, TournamentConfig, TournamentError, TournamentEvent, TournamentManager,
    TournamentResult, TournamentState,
};

/// Storage backends.
pub mod db;

/// Event fan-out.
pub mod notify;

/// Randomness sources.
pub mod random;

/// Periodic clock driver.
pub mod scheduler;

/// Wall clock sources.
pub mod time;
