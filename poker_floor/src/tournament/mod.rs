//! Live multi-table tournament floor.
//!
//! This module provides:
//! - Blind clock with pause/resume and level progression
//! - Seat allocation, table closures and final-table consolidation
//! - Rebalancing decisions after eliminations
//! - Player lifecycle (join, elimination, rebuy, leaderboard)
//! - A manager serializing commands per tournament
//!
//! ## Example
//!
//! ```no_run
//! use poker_floor::db::InMemoryTournamentRepository;
//! use poker_floor::notify::NotificationHub;
//! use poker_floor::tournament::{TournamentConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(
//!         Arc::new(InMemoryTournamentRepository::new()),
//!         Arc::new(NotificationHub::default()),
//!     );
//!
//!     // Three tables of nine, standard 20-minute levels
//!     let config = TournamentConfig::standard("Friday Deepstack".to_string(), 3, 9);
//!     let created = manager.create(config).await?;
//!
//!     manager.join(&created.code, "alice").await?;
//!     manager.assign_unseated_players(&created.code, &created.admin_token).await?;
//!     manager.start(&created.code, &created.admin_token).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod errors;
pub mod events;
pub mod locks;
pub mod manager;
pub mod models;
pub mod players;
pub mod rebalance;
pub mod seating;

pub use clock::{ClockView, LevelChange, TickOutcome};
pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use events::{TournamentEvent, TournamentSnapshot};
pub use locks::TournamentLocks;
pub use manager::{CreatedTournament, TickReport, TournamentManager};
pub use models::{
    BlindLevel, Clock, Player, PlayerId, StateTransition, Table, TableId, Tournament,
    TournamentConfig, TournamentState,
};
pub use players::{Elimination, LeaderboardEntry};
pub use rebalance::{PlayerRef, RebalanceInstruction, TableRoom};
pub use seating::{SeatMove, Seating};
