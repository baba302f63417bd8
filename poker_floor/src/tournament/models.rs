//! Tournament aggregate and its parts.

use super::errors::{TournamentError, TournamentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Table ID type (unique within a tournament)
pub type TableId = i64;

/// Player ID type (unique within a tournament)
pub type PlayerId = i64;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// Being configured, players may join and be removed
    Config,
    /// Clock running
    Running,
    /// Clock frozen
    Paused,
    /// One player left or blind schedule exhausted
    Finished,
}

impl TournamentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentState::Config => "config",
            TournamentState::Running => "running",
            TournamentState::Paused => "paused",
            TournamentState::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "config" => Some(TournamentState::Config),
            "running" => Some(TournamentState::Running),
            "paused" => Some(TournamentState::Paused),
            "finished" => Some(TournamentState::Finished),
            _ => None,
        }
    }
}

/// One step of the blind schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindLevel {
    /// Level number (0-indexed, matches the position in the schedule)
    pub level: u32,
    /// Small blind amount
    pub small_blind: i64,
    /// Big blind amount
    pub big_blind: i64,
    /// Ante amount (optional)
    pub ante: Option<i64>,
    /// Duration of this level in seconds
    pub duration_secs: u32,
    /// Break level (no play, clock still runs)
    pub is_break: bool,
}

impl BlindLevel {
    /// Create a new blind level
    pub fn new(level: u32, small_blind: i64, big_blind: i64, duration_secs: u32) -> Self {
        Self {
            level,
            small_blind,
            big_blind,
            ante: None,
            duration_secs,
            is_break: false,
        }
    }

    /// Create a break of the given length
    pub fn break_level(level: u32, duration_secs: u32) -> Self {
        Self {
            level,
            small_blind: 0,
            big_blind: 0,
            ante: None,
            duration_secs,
            is_break: true,
        }
    }

    /// Create a blind level with ante
    pub fn with_ante(mut self, ante: i64) -> Self {
        self.ante = Some(ante);
        self
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Number of tables created with the tournament
    pub tables_count: u32,
    /// Seats at every table
    pub seats_per_table: u32,
    /// Buy-in amount
    pub buy_in: i64,
    /// Starting chip stack for each player
    pub starting_stack: i64,
    /// Maximum rebuys per player (unlimited when absent)
    pub max_rebuys: Option<u32>,
    /// Last blind level index at which rebuys are accepted (no limit when absent)
    pub max_rebuy_level: Option<usize>,
    /// Blind level structure
    pub blind_levels: Vec<BlindLevel>,
}

impl TournamentConfig {
    /// Create a standard multi-table configuration with 20-minute levels
    pub fn standard(name: String, tables_count: u32, seats_per_table: u32) -> Self {
        let blind_levels = vec![
            BlindLevel::new(0, 25, 50, 1200),
            BlindLevel::new(1, 50, 100, 1200),
            BlindLevel::new(2, 75, 150, 1200),
            BlindLevel::new(3, 100, 200, 1200),
            BlindLevel::break_level(4, 600),
            BlindLevel::new(5, 150, 300, 1200).with_ante(25),
            BlindLevel::new(6, 200, 400, 1200).with_ante(50),
            BlindLevel::new(7, 300, 600, 1200).with_ante(75),
            BlindLevel::new(8, 400, 800, 1200).with_ante(100),
            BlindLevel::new(9, 600, 1200, 1200).with_ante(200),
        ];

        Self {
            name,
            tables_count,
            seats_per_table,
            buy_in: 20,
            starting_stack: 20_000,
            max_rebuys: Some(1),
            max_rebuy_level: Some(3),
            blind_levels,
        }
    }

    /// Create a turbo configuration (8-minute levels)
    pub fn turbo(name: String, tables_count: u32, seats_per_table: u32) -> Self {
        let mut config = Self::standard(name, tables_count, seats_per_table);
        for level in config.blind_levels.iter_mut().filter(|bl| !bl.is_break) {
            level.duration_secs = 480;
        }
        config
    }

    /// Hard ceiling on the number of active players
    pub fn capacity(&self) -> usize {
        self.tables_count as usize * self.seats_per_table as usize
    }

    /// Get blind level by schedule index
    pub fn get_blind_level(&self, index: usize) -> Option<&BlindLevel> {
        self.blind_levels.get(index)
    }

    /// Check the structural rules the clock and the allocator rely on
    pub fn validate(&self) -> TournamentResult<()> {
        if self.tables_count == 0 {
            return Err(TournamentError::InvalidConfig(
                "at least one table is required".to_string(),
            ));
        }
        if self.seats_per_table < 2 {
            return Err(TournamentError::InvalidConfig(
                "a table needs at least two seats".to_string(),
            ));
        }
        if self.blind_levels.is_empty() {
            return Err(TournamentError::InvalidConfig(
                "blind schedule is empty".to_string(),
            ));
        }
        for (index, level) in self.blind_levels.iter().enumerate() {
            if level.level as usize != index {
                return Err(TournamentError::InvalidConfig(format!(
                    "blind level at position {} is numbered {}",
                    index, level.level
                )));
            }
            if level.duration_secs == 0 {
                return Err(TournamentError::InvalidConfig(format!(
                    "blind level {} has a zero duration",
                    index
                )));
            }
        }
        Ok(())
    }
}

/// Blind clock, created when the tournament starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Index into the blind schedule
    pub current_level: usize,
    /// When the current running stretch of this level began
    pub level_started_at: DateTime<Utc>,
    /// Seconds banked on this level before the last pause
    pub elapsed_secs: u64,
    /// Frozen flag
    pub paused: bool,
}

/// A numbered table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub number: u32,
    /// Closed tables never receive new seatings
    pub closed: bool,
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub pseudo: String,
    pub name: String,
    pub table_id: Option<TableId>,
    /// Seat number in `1..=seats_per_table`
    pub seat: Option<u32>,
    pub eliminated: bool,
    pub rebuys: u32,
    /// Position in the elimination sequence of the last elimination
    pub elimination_seq: Option<u64>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn is_active(&self) -> bool {
        !self.eliminated
    }

    pub fn is_seated(&self) -> bool {
        self.table_id.is_some() && self.seat.is_some()
    }

    pub(crate) fn unseat(&mut self, now: DateTime<Utc>) {
        self.table_id = None;
        self.seat = None;
        self.updated_at = now;
    }
}

/// Entry of the append-only lifecycle log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: TournamentState,
    pub recorded_at: DateTime<Utc>,
}

/// Tournament aggregate: everything one read-modify-write touches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    /// Room code
    pub code: String,
    pub config: TournamentConfig,
    pub state: TournamentState,
    pub tables: Vec<Table>,
    pub players: Vec<Player>,
    pub clock: Option<Clock>,
    /// Lifecycle transitions, oldest first
    pub history: Vec<StateTransition>,
    pub next_player_id: PlayerId,
    pub eliminations: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Build a fresh tournament in `Config` with tables `1..=tables_count`
    pub fn new(code: String, config: TournamentConfig, now: DateTime<Utc>) -> Self {
        let tables = (1..=config.tables_count)
            .map(|number| Table {
                id: TableId::from(number),
                number,
                closed: false,
            })
            .collect();

        Self {
            code,
            config,
            state: TournamentState::Config,
            tables,
            players: Vec::new(),
            clock: None,
            history: Vec::new(),
            next_player_id: 1,
            eliminations: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seats_per_table(&self) -> u32 {
        self.config.seats_per_table
    }

    pub fn table(&self, table_id: TableId) -> TournamentResult<&Table> {
        self.tables
            .iter()
            .find(|t| t.id == table_id)
            .ok_or(TournamentError::TableNotFound(table_id))
    }

    pub(crate) fn table_mut(&mut self, table_id: TableId) -> TournamentResult<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or(TournamentError::TableNotFound(table_id))
    }

    pub fn player(&self, player_id: PlayerId) -> TournamentResult<&Player> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or(TournamentError::PlayerNotFound(player_id))
    }

    pub(crate) fn player_mut(&mut self, player_id: PlayerId) -> TournamentResult<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(TournamentError::PlayerNotFound(player_id))
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    /// Active players currently holding a seat at `table_id`
    pub fn seated_at(&self, table_id: TableId) -> impl Iterator<Item = &Player> {
        self.active_players()
            .filter(move |p| p.table_id == Some(table_id) && p.seat.is_some())
    }

    pub fn open_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| !t.closed)
    }

    pub fn current_blind(&self) -> Option<&BlindLevel> {
        self.clock
            .as_ref()
            .and_then(|clock| self.config.get_blind_level(clock.current_level))
    }

    /// Ensure the tournament is in `expected`
    pub(crate) fn expect_state(&self, expected: TournamentState) -> TournamentResult<()> {
        if self.state != expected {
            return Err(TournamentError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Change lifecycle state and append it to the transition log
    pub(crate) fn transition(&mut self, state: TournamentState, now: DateTime<Utc>) {
        self.state = state;
        self.history.push(StateTransition {
            state,
            recorded_at: now,
        });
        self.updated_at = now;
    }
}
