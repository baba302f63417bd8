//! Tournament manager: admin commands, player joins and clock ticks.
//!
//! Every mutation follows the same path: take the tournament lock, load the
//! aggregate, apply a synchronous step to a copy, save the copy together with
//! any new lifecycle transitions, then publish. A failing step leaves storage
//! untouched and publishes nothing.

use super::{
    clock::{LevelChange, TickOutcome},
    errors::{TournamentError, TournamentResult},
    events::{TournamentEvent, TournamentSnapshot},
    locks::TournamentLocks,
    models::{Player, PlayerId, TableId, Tournament, TournamentConfig, TournamentState},
    players::LeaderboardEntry,
    rebalance::RebalanceInstruction,
    seating::{SeatMove, Seating},
};
use crate::{
    db::TournamentRepository,
    notify::Notifier,
    random::{RandomSource, ThreadRandom},
    time::{SystemTime, TimeSource},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

const ROOM_CODE_ATTEMPTS: usize = 16;

/// Identifiers handed back on creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTournament {
    pub code: String,
    pub admin_token: String,
}

/// Result of one scheduler pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub ticked: usize,
    pub advanced: usize,
    pub finished: usize,
    pub failed: usize,
}

/// Context handed to a mutation step
struct Step<'a> {
    now: DateTime<Utc>,
    rng: &'a dyn RandomSource,
    events: Vec<TournamentEvent>,
}

impl Step<'_> {
    fn emit(&mut self, event: TournamentEvent) {
        self.events.push(event);
    }

    fn emit_seatings(&mut self, seatings: &[Seating]) {
        self.events.extend(seatings.iter().map(TournamentEvent::from));
    }

    fn emit_level_change(&mut self, change: LevelChange, tournament: &Tournament) {
        match change {
            LevelChange::Advanced { level } => self.emit(TournamentEvent::BlindsUp { level }),
            LevelChange::Finished => {
                self.emit(TournamentEvent::LeaderboardUpdated(tournament.leaderboard()))
            }
        }
    }
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repo: Arc<dyn TournamentRepository>,
    notifier: Arc<dyn Notifier>,
    locks: TournamentLocks,
    rng: Arc<dyn RandomSource>,
    time: Arc<dyn TimeSource>,
}

impl TournamentManager {
    /// Create a manager with OS randomness and the system clock
    pub fn new(repo: Arc<dyn TournamentRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            notifier,
            locks: TournamentLocks::new(),
            rng: Arc::new(ThreadRandom),
            time: Arc::new(SystemTime),
        }
    }

    pub fn with_random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_time(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    pub fn locks(&self) -> &TournamentLocks {
        &self.locks
    }

    async fn load(&self, code: &str) -> TournamentResult<Tournament> {
        self.repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| TournamentError::NotFound(code.to_string()))
    }

    /// Resolve the tournament, then check the admin token
    pub async fn authorize(&self, code: &str, token: &str) -> TournamentResult<()> {
        self.load(code).await?;
        self.check_token(code, token).await
    }

    async fn check_token(&self, code: &str, token: &str) -> TournamentResult<()> {
        if self.repo.verify_admin(code, token).await? {
            Ok(())
        } else {
            log::warn!("[{}] rejected admin token", code);
            Err(TournamentError::Unauthorized)
        }
    }

    /// Serialized read-modify-write of one tournament
    async fn mutate<T, F>(&self, code: &str, token: Option<&str>, step_fn: F) -> TournamentResult<T>
    where
        T: Send,
        F: FnOnce(&mut Tournament, &mut Step<'_>) -> TournamentResult<T> + Send,
    {
        let _guard = self.locks.acquire(code).await;

        let before = self.load(code).await?;
        if let Some(token) = token {
            self.check_token(code, token).await?;
        }

        let mut after = before.clone();
        let mut step = Step {
            now: self.time.now(),
            rng: self.rng.as_ref(),
            events: Vec::new(),
        };
        let value = step_fn(&mut after, &mut step)?;

        if after != before {
            self.repo
                .save(&after, &after.history[before.history.len()..])
                .await?;

            for event in step.events {
                self.notifier.publish(code, event);
            }
            self.notifier.publish(
                code,
                TournamentEvent::TournamentStateUpdated(Box::new(TournamentSnapshot::at(
                    &after, step.now,
                ))),
            );
        }
        Ok(value)
    }

    async fn generate_code(&self) -> TournamentResult<String> {
        for _ in 0..ROOM_CODE_ATTEMPTS {
            let mut code = Uuid::new_v4().simple().to_string();
            code.truncate(8);
            let code = code.to_uppercase();
            if self.repo.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(TournamentError::InvalidConfig(
            "could not allocate a free room code".to_string(),
        ))
    }

    /// Create a tournament in `config` with its tables and an admin token
    pub async fn create(&self, config: TournamentConfig) -> TournamentResult<CreatedTournament> {
        config.validate()?;

        let code = self.generate_code().await?;
        let admin_token = Uuid::new_v4().to_string();
        let tournament = Tournament::new(code.clone(), config, self.time.now());
        self.repo.insert(&tournament, &admin_token).await?;

        log::info!(
            "[{}] created '{}' with {} tables of {} seats",
            code,
            tournament.config.name,
            tournament.config.tables_count,
            tournament.config.seats_per_table
        );
        Ok(CreatedTournament { code, admin_token })
    }

    /// Full aggregate for the floor
    pub async fn get_for_admin(
        &self,
        code: &str,
        token: &str,
    ) -> TournamentResult<TournamentSnapshot> {
        let tournament = self.load(code).await?;
        self.check_token(code, token).await?;
        Ok(TournamentSnapshot::at(&tournament, self.time.now()))
    }

    /// Public view, as broadcast to watchers
    pub async fn snapshot(&self, code: &str) -> TournamentResult<TournamentSnapshot> {
        let tournament = self.load(code).await?;
        Ok(TournamentSnapshot::at(&tournament, self.time.now()))
    }

    pub async fn leaderboard(&self, code: &str) -> TournamentResult<Vec<LeaderboardEntry>> {
        Ok(self.load(code).await?.leaderboard())
    }

    pub async fn start(&self, code: &str, token: &str) -> TournamentResult<()> {
        self.mutate(code, Some(token), |t, step| {
            t.start(step.now)?;
            log::info!("[{}] started with {} players", t.code, t.active_count());
            Ok(())
        })
        .await
    }

    pub async fn pause(&self, code: &str, token: &str) -> TournamentResult<()> {
        self.mutate(code, Some(token), |t, step| t.pause(step.now))
            .await
    }

    pub async fn resume(&self, code: &str, token: &str) -> TournamentResult<()> {
        self.mutate(code, Some(token), |t, step| t.resume(step.now))
            .await
    }

    /// Manual advance to the next blind level
    pub async fn next_level(&self, code: &str, token: &str) -> TournamentResult<LevelChange> {
        self.mutate(code, Some(token), |t, step| {
            let change = t.next_level(step.now)?;
            step.emit_level_change(change, t);
            Ok(change)
        })
        .await
    }

    pub async fn reset_clock(&self, code: &str, token: &str) -> TournamentResult<()> {
        self.mutate(code, Some(token), |t, step| t.reset_clock(step.now))
            .await
    }

    /// Eliminate a player, or let them buy back in when `rebuy` is set.
    ///
    /// Returns the rebalancing instruction raised by an elimination.
    pub async fn eliminate_or_rebuy(
        &self,
        code: &str,
        token: &str,
        player_id: PlayerId,
        rebuy: bool,
    ) -> TournamentResult<Option<RebalanceInstruction>> {
        self.mutate(code, Some(token), |t, step| {
            if rebuy {
                t.rebuy(player_id, step.now)?;
                step.emit(TournamentEvent::PlayerRebought { player_id });
                step.emit(TournamentEvent::LeaderboardUpdated(t.leaderboard()));
                return Ok(None);
            }

            let elimination = t.eliminate(player_id, step.now)?;
            step.emit(TournamentEvent::PlayerEliminated { player_id });
            if let Some(instruction) = &elimination.rebalance {
                log::info!("[{}] rebalancing needed: {:?}", t.code, instruction);
                step.emit(TournamentEvent::RebalancingNeeded(instruction.clone()));
            }
            step.emit(TournamentEvent::LeaderboardUpdated(t.leaderboard()));
            Ok(elimination.rebalance)
        })
        .await
    }

    pub async fn seat_change(
        &self,
        code: &str,
        token: &str,
        player_id: PlayerId,
        to_table: TableId,
    ) -> TournamentResult<Seating> {
        self.mutate(code, Some(token), |t, step| {
            let seating = t.seat_change(player_id, to_table, step.now)?;
            step.emit_seatings(std::slice::from_ref(&seating));
            Ok(seating)
        })
        .await
    }

    /// Seat everyone without a seat
    pub async fn assign_unseated_players(
        &self,
        code: &str,
        token: &str,
    ) -> TournamentResult<Vec<Seating>> {
        self.mutate(code, Some(token), |t, step| {
            let seatings = t.assign_random(step.rng, step.now)?;
            step.emit_seatings(&seatings);
            Ok(seatings)
        })
        .await
    }

    pub async fn close_table_redistribute(
        &self,
        code: &str,
        token: &str,
        from_table: TableId,
        moves: Vec<SeatMove>,
    ) -> TournamentResult<Vec<Seating>> {
        self.mutate(code, Some(token), move |t, step| {
            let seatings = t.close_table_redistribute(from_table, &moves, step.now)?;
            step.emit_seatings(&seatings);
            step.emit(TournamentEvent::TableRedistributed {
                table_id: from_table,
            });
            Ok(seatings)
        })
        .await
    }

    pub async fn full_redistribute(
        &self,
        code: &str,
        token: &str,
        from_table: TableId,
    ) -> TournamentResult<Vec<Seating>> {
        self.mutate(code, Some(token), |t, step| {
            let seatings = t.full_redistribute(from_table, step.rng, step.now)?;
            log::info!(
                "[{}] table {} broken, {} players moved",
                t.code,
                from_table,
                seatings.len()
            );
            step.emit_seatings(&seatings);
            step.emit(TournamentEvent::TableRedistributed {
                table_id: from_table,
            });
            Ok(seatings)
        })
        .await
    }

    pub async fn final_table_consolidate(
        &self,
        code: &str,
        token: &str,
        target: TableId,
    ) -> TournamentResult<Vec<Seating>> {
        self.mutate(code, Some(token), |t, step| {
            let seatings = t.final_table_consolidate(target, step.rng, step.now)?;
            log::info!("[{}] final table is {}", t.code, target);
            step.emit_seatings(&seatings);
            step.emit(TournamentEvent::FinalTableRedistributed { table_id: target });
            Ok(seatings)
        })
        .await
    }

    /// Public join by pseudo. A known pseudo gets its existing player back.
    pub async fn join(&self, code: &str, pseudo: &str) -> TournamentResult<Player> {
        self.mutate(code, None, |t, step| {
            Ok(t.register_player(pseudo, step.now)?.clone())
        })
        .await
    }

    /// Delete a player while the tournament is still being configured
    pub async fn remove_player(
        &self,
        code: &str,
        token: &str,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        self.mutate(code, Some(token), |t, step| {
            t.remove_player(player_id, step.now)?;
            Ok(())
        })
        .await
    }

    /// Advance the clock of one tournament if its level ran out
    pub async fn tick(&self, code: &str) -> TournamentResult<TickOutcome> {
        self.mutate(code, None, |t, step| {
            let outcome = t.tick(step.now)?;
            if let TickOutcome::Changed(change) = outcome {
                log::info!("[{}] clock: {:?}", t.code, change);
                step.emit_level_change(change, t);
            }
            Ok(outcome)
        })
        .await
    }

    /// Tick every running tournament concurrently.
    ///
    /// A failure on one tournament is logged and does not affect the others.
    pub async fn tick_all(&self) -> TournamentResult<TickReport> {
        let codes = self.repo.codes_in_state(TournamentState::Running).await?;
        let mut report = TickReport::default();
        let mut tasks = JoinSet::new();

        for code in codes {
            let manager = self.clone();
            tasks.spawn(async move {
                let result = manager.tick(&code).await;
                (code, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            report.ticked += 1;
            match joined {
                Ok((_, Ok(TickOutcome::Idle))) => {}
                Ok((_, Ok(TickOutcome::Changed(LevelChange::Advanced { .. })))) => {
                    report.advanced += 1
                }
                Ok((_, Ok(TickOutcome::Changed(LevelChange::Finished)))) => report.finished += 1,
                Ok((code, Err(e))) => {
                    report.failed += 1;
                    log::warn!("[{}] tick failed: {}", code, e);
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!("tick task aborted: {}", e);
                }
            }
        }

        self.locks.prune();
        Ok(report)
    }
}
