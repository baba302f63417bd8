//! Blind clock: start, pause, resume and level progression.
//!
//! All arithmetic is in whole seconds. Wall-clock deltas are truncated, so a
//! level never ends before its full duration has been spent running.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{BlindLevel, Clock, Tournament, TournamentState},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of moving the clock forward by one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    /// Now playing the level at this schedule index
    Advanced { level: usize },
    /// Schedule exhausted, tournament finished
    Finished,
}

/// Result of a periodic tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do (not running, paused, or level time left)
    Idle,
    Changed(LevelChange),
}

/// Read-only clock view published with every snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockView {
    pub current_level: usize,
    pub blind: Option<BlindLevel>,
    pub seconds_in_level: u64,
    pub seconds_remaining: u64,
    pub paused: bool,
}

/// Whole seconds from `from` to `to`, truncated and never negative
pub fn whole_seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().max(0) as u64
}

impl Clock {
    fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            current_level: 0,
            level_started_at: now,
            elapsed_secs: 0,
            paused: false,
        }
    }

    /// Seconds spent running on the current level
    pub fn seconds_in_level(&self, now: DateTime<Utc>) -> u64 {
        if self.paused {
            self.elapsed_secs
        } else {
            self.elapsed_secs + whole_seconds_between(self.level_started_at, now)
        }
    }

    /// Bank the running stretch into `elapsed_secs` and freeze
    fn freeze(&mut self, now: DateTime<Utc>) {
        if !self.paused {
            self.elapsed_secs += whole_seconds_between(self.level_started_at, now);
            self.paused = true;
        }
    }
}

impl Tournament {
    fn clock_mut(&mut self) -> TournamentResult<&mut Clock> {
        self.clock
            .as_mut()
            .ok_or_else(|| TournamentError::InvalidTransition("clock not started".to_string()))
    }

    /// `Config` -> `Running`, clock at level 0
    pub fn start(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.expect_state(TournamentState::Config)?;
        self.clock = Some(Clock::started_at(now));
        self.transition(TournamentState::Running, now);
        Ok(())
    }

    /// `Running` -> `Paused`, banking the running time of the level
    pub fn pause(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.expect_state(TournamentState::Running)?;
        self.clock_mut()?.freeze(now);
        self.transition(TournamentState::Paused, now);
        Ok(())
    }

    /// `Paused` -> `Running`, the level keeps its banked seconds
    pub fn resume(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.expect_state(TournamentState::Paused)?;
        let clock = self.clock_mut()?;
        clock.level_started_at = now;
        clock.paused = false;
        self.transition(TournamentState::Running, now);
        Ok(())
    }

    /// Advance at most one level if the current one has run its full duration
    pub fn tick(&mut self, now: DateTime<Utc>) -> TournamentResult<TickOutcome> {
        if self.state != TournamentState::Running {
            return Ok(TickOutcome::Idle);
        }
        let Some(clock) = self.clock.as_ref() else {
            return Ok(TickOutcome::Idle);
        };
        if clock.paused {
            return Ok(TickOutcome::Idle);
        }
        let Some(level) = self.config.get_blind_level(clock.current_level) else {
            return Ok(TickOutcome::Idle);
        };

        if clock.seconds_in_level(now) >= u64::from(level.duration_secs) {
            let change = self.next_level(now)?;
            return Ok(TickOutcome::Changed(change));
        }
        Ok(TickOutcome::Idle)
    }

    /// Move to the next blind level, finishing the tournament after the last one.
    ///
    /// A manual advance during a pause keeps the clock frozen on the new level.
    pub fn next_level(&mut self, now: DateTime<Utc>) -> TournamentResult<LevelChange> {
        if !matches!(
            self.state,
            TournamentState::Running | TournamentState::Paused
        ) {
            return Err(TournamentError::InvalidTransition(format!(
                "cannot change level while {}",
                self.state.as_str()
            )));
        }

        let levels = self.config.blind_levels.len();
        let paused = self.state == TournamentState::Paused;
        let clock = self.clock_mut()?;

        if clock.current_level + 1 >= levels {
            self.finish(now);
            return Ok(LevelChange::Finished);
        }

        clock.current_level += 1;
        clock.level_started_at = now;
        clock.elapsed_secs = 0;
        clock.paused = paused;
        let level = clock.current_level;
        self.updated_at = now;
        Ok(LevelChange::Advanced { level })
    }

    /// Hard reset to level 0. Keeps the lifecycle state; the clock only runs
    /// if the tournament is running.
    pub fn reset_clock(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        let running = self.state == TournamentState::Running;
        let clock = self.clock_mut()?;
        clock.current_level = 0;
        clock.level_started_at = now;
        clock.elapsed_secs = 0;
        clock.paused = !running;
        self.updated_at = now;
        Ok(())
    }

    /// Freeze the clock and mark the tournament finished
    pub(crate) fn finish(&mut self, now: DateTime<Utc>) {
        if let Some(clock) = self.clock.as_mut() {
            clock.freeze(now);
        }
        self.transition(TournamentState::Finished, now);
    }

    pub fn clock_view(&self, now: DateTime<Utc>) -> Option<ClockView> {
        let clock = self.clock.as_ref()?;
        let blind = self.config.get_blind_level(clock.current_level).cloned();
        let seconds_in_level = clock.seconds_in_level(now);
        let seconds_remaining = blind
            .as_ref()
            .map(|b| u64::from(b.duration_secs).saturating_sub(seconds_in_level))
            .unwrap_or(0);

        Some(ClockView {
            current_level: clock.current_level,
            blind,
            seconds_in_level,
            seconds_remaining,
            paused: clock.paused,
        })
    }
}
