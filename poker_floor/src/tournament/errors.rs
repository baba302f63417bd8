//! Tournament error types.

use super::models::{PlayerId, TableId, TournamentState};
use thiserror::Error;

/// Coarse error classification handed to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidStateTransition,
    CapacityExceeded,
    RebuyNotAllowed,
    InvalidInput,
    Internal,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Invalid admin token")]
    Unauthorized,

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentState,
        actual: TournamentState,
    },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Table {0} is closed")]
    TableClosed(TableId),

    #[error("Tournament is full ({capacity} seats)")]
    TournamentFull { capacity: usize },

    #[error("No free seat on table {0}")]
    NoFreeSeat(TableId),

    #[error("Not enough seats: need {needed}, have {available}")]
    InsufficientSeats { needed: usize, available: usize },

    #[error("Rebuy not allowed: {0}")]
    RebuyNotAllowed(String),

    #[error("Invalid tournament configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pseudo: {0}")]
    InvalidPseudo(String),

    #[error("Seat invariant violated on table {table_id}: seat {seat}")]
    SeatInvariant { table_id: TableId, seat: u32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    /// Classify the error for callers that map it onto a transport response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::NotFound(_)
            | TournamentError::TableNotFound(_)
            | TournamentError::PlayerNotFound(_) => ErrorKind::NotFound,
            TournamentError::Unauthorized => ErrorKind::Unauthorized,
            TournamentError::InvalidState { .. }
            | TournamentError::InvalidTransition(_)
            | TournamentError::TableClosed(_) => ErrorKind::InvalidStateTransition,
            TournamentError::TournamentFull { .. }
            | TournamentError::NoFreeSeat(_)
            | TournamentError::InsufficientSeats { .. } => ErrorKind::CapacityExceeded,
            TournamentError::RebuyNotAllowed(_) => ErrorKind::RebuyNotAllowed,
            TournamentError::InvalidConfig(_) | TournamentError::InvalidPseudo(_) => {
                ErrorKind::InvalidInput
            }
            TournamentError::SeatInvariant { .. }
            | TournamentError::Database(_)
            | TournamentError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;
