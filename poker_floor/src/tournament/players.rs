//! Player lifecycle: join, removal, elimination, rebuy and standings.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{Player, PlayerId, TableId, Tournament, TournamentState},
    rebalance::RebalanceInstruction,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub player_id: PlayerId,
    pub pseudo: String,
    pub name: String,
    pub eliminated: bool,
    pub rebuys: u32,
    pub table_id: Option<TableId>,
    pub seat: Option<u32>,
}

/// Consequences of an elimination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    pub player_id: PlayerId,
    pub rebalance: Option<RebalanceInstruction>,
    pub finished: bool,
}

impl Tournament {
    /// Case-insensitive lookup by pseudo
    pub fn find_by_pseudo(&self, pseudo: &str) -> Option<&Player> {
        let wanted = pseudo.trim().to_lowercase();
        self.players
            .iter()
            .find(|p| p.pseudo.to_lowercase() == wanted)
    }

    /// Register a player, or hand back the one already using this pseudo.
    ///
    /// New players start unseated and count against the tournament capacity.
    pub fn register_player(
        &mut self,
        pseudo: &str,
        now: DateTime<Utc>,
    ) -> TournamentResult<&Player> {
        let pseudo = pseudo.trim();
        if pseudo.is_empty() {
            return Err(TournamentError::InvalidPseudo(
                "pseudo cannot be empty".to_string(),
            ));
        }
        if self.state == TournamentState::Finished {
            return Err(TournamentError::InvalidTransition(
                "tournament is finished".to_string(),
            ));
        }

        if let Some(index) = self
            .players
            .iter()
            .position(|p| p.pseudo.to_lowercase() == pseudo.to_lowercase())
        {
            return Ok(&self.players[index]);
        }

        let capacity = self.config.capacity();
        if self.active_count() >= capacity {
            return Err(TournamentError::TournamentFull { capacity });
        }

        let id = self.next_player_id;
        self.next_player_id += 1;
        self.players.push(Player {
            id,
            pseudo: pseudo.to_string(),
            name: pseudo.to_string(),
            table_id: None,
            seat: None,
            eliminated: false,
            rebuys: 0,
            elimination_seq: None,
            joined_at: now,
            updated_at: now,
        });
        self.updated_at = now;

        let index = self.players.len() - 1;
        Ok(&self.players[index])
    }

    /// Delete a player. Only while the tournament is being configured.
    pub fn remove_player(
        &mut self,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Player> {
        self.expect_state(TournamentState::Config)?;
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(TournamentError::PlayerNotFound(player_id))?;
        self.updated_at = now;
        Ok(self.players.remove(index))
    }

    /// Knock a player out, then rebalance and check for a winner
    pub fn eliminate(
        &mut self,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Elimination> {
        if !matches!(
            self.state,
            TournamentState::Running | TournamentState::Paused
        ) {
            return Err(TournamentError::InvalidTransition(format!(
                "cannot eliminate while {}",
                self.state.as_str()
            )));
        }

        let seq = self.eliminations + 1;
        let player = self.player_mut(player_id)?;
        if player.eliminated {
            return Err(TournamentError::InvalidTransition(format!(
                "player {} is already eliminated",
                player_id
            )));
        }
        player.eliminated = true;
        player.elimination_seq = Some(seq);
        player.unseat(now);
        self.eliminations = seq;

        let rebalance = self.rebalance(now)?;

        let finished = self.active_count() <= 1;
        if finished {
            log::info!("[{}] one player left, tournament finished", self.code);
            self.finish(now);
        }

        Ok(Elimination {
            player_id,
            rebalance,
            finished,
        })
    }

    /// Buy back in. The player is active again but stays unseated.
    pub fn rebuy(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> TournamentResult<()> {
        if self.state == TournamentState::Finished {
            return Err(TournamentError::InvalidTransition(
                "tournament is finished".to_string(),
            ));
        }

        let level = self.clock.as_ref().map_or(0, |c| c.current_level);
        let max_rebuys = self.config.max_rebuys;
        let max_rebuy_level = self.config.max_rebuy_level;

        let player = self.player_mut(player_id)?;
        if let Some(max) = max_rebuys
            && player.rebuys >= max
        {
            return Err(TournamentError::RebuyNotAllowed(format!(
                "player {} already used {} of {} rebuys",
                player_id, player.rebuys, max
            )));
        }
        if let Some(last) = max_rebuy_level
            && level > last
        {
            return Err(TournamentError::RebuyNotAllowed(format!(
                "rebuys closed after level {}",
                last
            )));
        }

        player.rebuys += 1;
        player.eliminated = false;
        player.elimination_seq = None;
        player.updated_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Active players first, then eliminated ones, latest elimination first
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut active: Vec<&Player> = self.active_players().collect();
        active.sort_by_key(|p| p.id);

        let mut out: Vec<&Player> = self.players.iter().filter(|p| p.eliminated).collect();
        out.sort_by(|a, b| b.elimination_seq.cmp(&a.elimination_seq));

        active
            .into_iter()
            .chain(out)
            .enumerate()
            .map(|(index, p)| LeaderboardEntry {
                rank: index + 1,
                player_id: p.id,
                pseudo: p.pseudo.clone(),
                name: p.name.clone(),
                eliminated: p.eliminated,
                rebuys: p.rebuys,
                table_id: p.table_id,
                seat: p.seat,
            })
            .collect()
    }
}
