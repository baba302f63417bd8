//! Tournament API handlers.
//!
//! Public routes: creation, snapshot, leaderboard and join. Everything else
//! is an admin command and needs the tournament's admin token as a bearer
//! token.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:6969/api/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Friday Deepstack", "tables_count": 3, "seats_per_table": 9}'
//! ```
//!
//! Eliminate a player:
//! ```bash
//! curl -X POST http://localhost:6969/api/tournaments/A1B2C3D4/eliminate \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"player_id": 7}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use poker_floor::{
    TournamentResult,
    tournament::{
        BlindLevel, LeaderboardEntry, LevelChange, Player, PlayerId, RebalanceInstruction,
        SeatMove, Seating, TableId, TournamentConfig, TournamentSnapshot,
    },
};
use serde::{Deserialize, Serialize};

use super::{AdminToken, ApiError, AppState, kind_name};
use crate::{logging::log_admin_command, metrics};

/// Blind structure to start from
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Standard,
    Turbo,
}

/// Creation request. Omitted optional fields keep the preset's values.
#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub tables_count: u32,
    pub seats_per_table: u32,
    #[serde(default)]
    pub preset: Preset,
    pub buy_in: Option<i64>,
    pub starting_stack: Option<i64>,
    pub max_rebuys: Option<u32>,
    pub max_rebuy_level: Option<usize>,
    pub blind_levels: Option<Vec<BlindLevel>>,
}

impl CreateTournamentRequest {
    fn into_config(self) -> TournamentConfig {
        let mut config = match self.preset {
            Preset::Standard => {
                TournamentConfig::standard(self.name, self.tables_count, self.seats_per_table)
            }
            Preset::Turbo => {
                TournamentConfig::turbo(self.name, self.tables_count, self.seats_per_table)
            }
        };
        if let Some(buy_in) = self.buy_in {
            config.buy_in = buy_in;
        }
        if let Some(stack) = self.starting_stack {
            config.starting_stack = stack;
        }
        if self.max_rebuys.is_some() {
            config.max_rebuys = self.max_rebuys;
        }
        if self.max_rebuy_level.is_some() {
            config.max_rebuy_level = self.max_rebuy_level;
        }
        if let Some(levels) = self.blind_levels {
            config.blind_levels = levels;
        }
        config
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTournamentResponse {
    pub code: String,
    pub admin_token: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub pseudo: String,
}

#[derive(Debug, Serialize)]
pub struct NextLevelResponse {
    pub finished: bool,
    pub level: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EliminateRequest {
    pub player_id: PlayerId,
    #[serde(default)]
    pub rebuy: bool,
}

#[derive(Debug, Serialize)]
pub struct EliminateResponse {
    pub rebalance: Option<RebalanceInstruction>,
}

#[derive(Debug, Deserialize)]
pub struct SeatChangeRequest {
    pub player_id: PlayerId,
    pub to_table: TableId,
}

#[derive(Debug, Deserialize)]
pub struct CloseTableRequest {
    pub from_table: TableId,
    pub moves: Vec<SeatMove>,
}

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    pub table_id: TableId,
}

/// Record and log an admin command, then hand its result to the client
fn audited<T>(command: &str, code: &str, result: TournamentResult<T>) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            metrics::admin_commands_total(command, "ok");
            log_admin_command(code, command, "ok", None);
            Ok(value)
        }
        Err(err) => {
            let outcome = kind_name(err.kind());
            metrics::admin_commands_total(command, outcome);
            log_admin_command(code, command, outcome, Some(&err.client_message()));
            Err(ApiError(err))
        }
    }
}

/// Create a tournament
///
/// Responds `201 Created` with the room code and the admin token. The token
/// is only ever returned here.
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<CreateTournamentResponse>), ApiError> {
    let created = state.manager.create(request.into_config()).await;
    let created = audited("create", "-", created)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateTournamentResponse {
            code: created.code,
            admin_token: created.admin_token,
        }),
    ))
}

/// Public snapshot with the clock view
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TournamentSnapshot>, ApiError> {
    Ok(Json(state.manager.snapshot(&code).await?))
}

pub async fn get_admin_view(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<Json<TournamentSnapshot>, ApiError> {
    Ok(Json(state.manager.get_for_admin(&code, &token).await?))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(state.manager.leaderboard(&code).await?))
}

/// Join by pseudo; a known pseudo gets its player back
pub async fn join_tournament(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.manager.join(&code, &request.pseudo).await?))
}

pub async fn remove_player(
    State(state): State<AppState>,
    Path((code, player_id)): Path<(String, PlayerId)>,
    AdminToken(token): AdminToken,
) -> Result<StatusCode, ApiError> {
    let result = state.manager.remove_player(&code, &token, player_id).await;
    audited("remove_player", &code, result)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<StatusCode, ApiError> {
    audited("start", &code, state.manager.start(&code, &token).await)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<StatusCode, ApiError> {
    audited("pause", &code, state.manager.pause(&code, &token).await)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resume(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<StatusCode, ApiError> {
    audited("resume", &code, state.manager.resume(&code, &token).await)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn next_level(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<Json<NextLevelResponse>, ApiError> {
    let change = audited(
        "next_level",
        &code,
        state.manager.next_level(&code, &token).await,
    )?;
    let response = match change {
        LevelChange::Advanced { level } => NextLevelResponse {
            finished: false,
            level: Some(level),
        },
        LevelChange::Finished => NextLevelResponse {
            finished: true,
            level: None,
        },
    };
    Ok(Json(response))
}

pub async fn reset_clock(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<StatusCode, ApiError> {
    audited(
        "reset_clock",
        &code,
        state.manager.reset_clock(&code, &token).await,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

/// Eliminate a player, or rebuy with `"rebuy": true`
pub async fn eliminate_or_rebuy(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
    Json(request): Json<EliminateRequest>,
) -> Result<Json<EliminateResponse>, ApiError> {
    let command = if request.rebuy { "rebuy" } else { "eliminate" };
    let rebalance = audited(
        command,
        &code,
        state
            .manager
            .eliminate_or_rebuy(&code, &token, request.player_id, request.rebuy)
            .await,
    )?;
    Ok(Json(EliminateResponse { rebalance }))
}

pub async fn seat_change(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
    Json(request): Json<SeatChangeRequest>,
) -> Result<Json<Seating>, ApiError> {
    let seating = audited(
        "seat_change",
        &code,
        state
            .manager
            .seat_change(&code, &token, request.player_id, request.to_table)
            .await,
    )?;
    Ok(Json(seating))
}

pub async fn assign_seats(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
) -> Result<Json<Vec<Seating>>, ApiError> {
    let seatings = audited(
        "assign_seats",
        &code,
        state.manager.assign_unseated_players(&code, &token).await,
    )?;
    Ok(Json(seatings))
}

/// Break a table following the floor's own mapping
pub async fn close_table(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
    Json(request): Json<CloseTableRequest>,
) -> Result<Json<Vec<Seating>>, ApiError> {
    let seatings = audited(
        "close_table",
        &code,
        state
            .manager
            .close_table_redistribute(&code, &token, request.from_table, request.moves)
            .await,
    )?;
    Ok(Json(seatings))
}

pub async fn full_redistribute(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
    Json(request): Json<TableRequest>,
) -> Result<Json<Vec<Seating>>, ApiError> {
    let seatings = audited(
        "full_redistribute",
        &code,
        state
            .manager
            .full_redistribute(&code, &token, request.table_id)
            .await,
    )?;
    Ok(Json(seatings))
}

pub async fn final_table(
    State(state): State<AppState>,
    Path(code): Path<String>,
    AdminToken(token): AdminToken,
    Json(request): Json<TableRequest>,
) -> Result<Json<Vec<Seating>>, ApiError> {
    let seatings = audited(
        "final_table",
        &code,
        state
            .manager
            .final_table_consolidate(&code, &token, request.table_id)
            .await,
    )?;
    Ok(Json(seatings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_to_standard() {
        let request: CreateTournamentRequest = serde_json::from_str(
            r#"{"name": "Sunday", "tables_count": 2, "seats_per_table": 9}"#,
        )
        .unwrap();
        let config = request.into_config();
        assert_eq!(
            config,
            TournamentConfig::standard("Sunday".to_string(), 2, 9)
        );
    }

    #[test]
    fn test_create_request_overrides() {
        let request: CreateTournamentRequest = serde_json::from_str(
            r#"{
                "name": "Turbo",
                "tables_count": 1,
                "seats_per_table": 6,
                "preset": "turbo",
                "buy_in": 50,
                "max_rebuys": 3
            }"#,
        )
        .unwrap();
        let config = request.into_config();
        assert_eq!(config.buy_in, 50);
        assert_eq!(config.max_rebuys, Some(3));
        assert!(
            config
                .blind_levels
                .iter()
                .filter(|level| !level.is_break)
                .all(|level| level.duration_secs == 480)
        );
    }

    #[test]
    fn test_eliminate_request_rebuy_defaults_off() {
        let request: EliminateRequest = serde_json::from_str(r#"{"player_id": 4}"#).unwrap();
        assert_eq!(request.player_id, 4);
        assert!(!request.rebuy);
    }
}
