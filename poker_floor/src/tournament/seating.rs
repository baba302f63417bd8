//! Seat allocator: free-seat search, random fill and bulk reseating.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{PlayerId, TableId, Tournament},
};
use crate::random::{RandomSource, pick, shuffle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A player landing on a seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seating {
    pub player_id: PlayerId,
    pub pseudo: String,
    pub table_id: TableId,
    pub seat: u32,
}

/// One entry of an admin-provided table closure mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMove {
    pub player_id: PlayerId,
    pub to_table_id: TableId,
}

impl Tournament {
    fn taken_seats(&self, table_id: TableId) -> HashSet<u32> {
        self.seated_at(table_id).filter_map(|p| p.seat).collect()
    }

    /// Free seats at `table_id`, ascending
    pub fn free_seats(&self, table_id: TableId) -> Vec<u32> {
        let taken = self.taken_seats(table_id);
        (1..=self.seats_per_table())
            .filter(|seat| !taken.contains(seat))
            .collect()
    }

    /// Lowest seat not held by an active player
    pub fn free_seat(&self, table_id: TableId) -> TournamentResult<u32> {
        self.table(table_id)?;
        self.free_seats(table_id)
            .first()
            .copied()
            .ok_or(TournamentError::NoFreeSeat(table_id))
    }

    /// Active seated players at `table_id`
    pub fn occupancy(&self, table_id: TableId) -> usize {
        self.seated_at(table_id).count()
    }

    fn open_table(&self, table_id: TableId) -> TournamentResult<()> {
        if self.table(table_id)?.closed {
            return Err(TournamentError::TableClosed(table_id));
        }
        Ok(())
    }

    fn unseated_active(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .active_players()
            .filter(|p| !p.is_seated())
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Put one player on one seat after checking the table and seat are usable
    fn seat_player(
        &mut self,
        player_id: PlayerId,
        table_id: TableId,
        seat: u32,
        now: DateTime<Utc>,
    ) -> TournamentResult<Seating> {
        self.open_table(table_id)?;
        if seat == 0 || seat > self.seats_per_table() {
            return Err(TournamentError::SeatInvariant { table_id, seat });
        }
        let holder = self
            .seated_at(table_id)
            .find(|p| p.seat == Some(seat))
            .map(|p| p.id);
        if holder.is_some_and(|id| id != player_id) {
            return Err(TournamentError::SeatInvariant { table_id, seat });
        }

        let player = self.player_mut(player_id)?;
        if !player.is_active() {
            return Err(TournamentError::InvalidTransition(format!(
                "player {} is eliminated",
                player_id
            )));
        }
        player.table_id = Some(table_id);
        player.seat = Some(seat);
        player.updated_at = now;

        Ok(Seating {
            player_id,
            pseudo: player.pseudo.clone(),
            table_id,
            seat,
        })
    }

    /// Least-populated open table with room, ties by table order
    fn least_filled(&self, exclude: Option<TableId>) -> Option<TableId> {
        let seats = self.seats_per_table() as usize;
        self.open_tables()
            .filter(|t| Some(t.id) != exclude)
            .map(|t| (t.id, self.occupancy(t.id)))
            .filter(|(_, count)| *count < seats)
            .min_by_key(|(_, count)| *count)
            .map(|(id, _)| id)
    }

    /// Initial fill: every unseated active player gets a random seat on the
    /// least-populated open table. Players that find no room stay unseated.
    pub fn assign_random(
        &mut self,
        rng: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<Seating>> {
        let mut players = self.unseated_active();
        shuffle(rng, &mut players);

        let mut seatings = Vec::with_capacity(players.len());
        for player_id in players {
            let Some(table_id) = self.least_filled(None) else {
                log::warn!(
                    "[{}] no free seat left for player {}, leaving unseated",
                    self.code,
                    player_id
                );
                continue;
            };
            let free = self.free_seats(table_id);
            let seat = *pick(rng, &free).ok_or(TournamentError::NoFreeSeat(table_id))?;
            seatings.push(self.seat_player(player_id, table_id, seat, now)?);
        }

        self.validate_seating()?;
        self.updated_at = now;
        Ok(seatings)
    }

    /// Apply an admin mapping out of `from_table`, then close it
    pub fn close_table_redistribute(
        &mut self,
        from_table: TableId,
        moves: &[SeatMove],
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<Seating>> {
        self.open_table(from_table)?;

        let mut seatings = Vec::with_capacity(moves.len());
        for mv in moves {
            if mv.to_table_id == from_table {
                return Err(TournamentError::InvalidTransition(format!(
                    "table {} cannot receive players while closing",
                    from_table
                )));
            }
            self.open_table(mv.to_table_id)?;
            let seat = self.free_seat(mv.to_table_id)?;
            seatings.push(self.seat_player(mv.player_id, mv.to_table_id, seat, now)?);
        }

        self.close_table(from_table, now)?;
        self.validate_seating()?;
        Ok(seatings)
    }

    /// Empty `from_table` and spread every unassigned active player over the
    /// remaining open tables. Fails without side effects when room is short.
    pub fn full_redistribute(
        &mut self,
        from_table: TableId,
        rng: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<Seating>> {
        self.open_table(from_table)?;

        let leaving: Vec<PlayerId> = self.seated_at(from_table).map(|p| p.id).collect();
        let needed = self.unseated_active().len() + leaving.len();
        let available: usize = self
            .open_tables()
            .filter(|t| t.id != from_table)
            .map(|t| self.free_seats(t.id).len())
            .sum();
        if available < needed {
            return Err(TournamentError::InsufficientSeats { needed, available });
        }

        for id in leaving {
            self.player_mut(id)?.unseat(now);
        }
        let mut players = self.unseated_active();
        shuffle(rng, &mut players);

        let mut seatings = Vec::with_capacity(players.len());
        for player_id in players {
            let table_id = self
                .least_filled(Some(from_table))
                .ok_or(TournamentError::InsufficientSeats { needed, available })?;
            let free = self.free_seats(table_id);
            let seat = *pick(rng, &free).ok_or(TournamentError::NoFreeSeat(table_id))?;
            seatings.push(self.seat_player(player_id, table_id, seat, now)?);
        }

        self.close_table(from_table, now)?;
        self.validate_seating()?;
        Ok(seatings)
    }

    /// Move every active player to `target` on unique random seats and close
    /// every other table
    pub fn final_table_consolidate(
        &mut self,
        target: TableId,
        rng: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> TournamentResult<Vec<Seating>> {
        self.open_table(target)?;

        let seats = self.seats_per_table() as usize;
        let mut players: Vec<PlayerId> = self.active_players().map(|p| p.id).collect();
        if players.len() > seats {
            return Err(TournamentError::InsufficientSeats {
                needed: players.len(),
                available: seats,
            });
        }
        players.sort_unstable();

        for &id in &players {
            self.player_mut(id)?.unseat(now);
        }

        let mut taken = HashSet::with_capacity(players.len());
        let mut seatings = Vec::with_capacity(players.len());
        for id in players {
            let seat = loop {
                let candidate = rng.index(seats) as u32 + 1;
                if taken.insert(candidate) {
                    break candidate;
                }
            };
            seatings.push(self.seat_player(id, target, seat, now)?);
        }

        let others: Vec<TableId> = self
            .open_tables()
            .filter(|t| t.id != target)
            .map(|t| t.id)
            .collect();
        for table_id in others {
            self.close_table(table_id, now)?;
        }

        self.validate_seating()?;
        Ok(seatings)
    }

    /// Move one player to the lowest free seat of `to_table`.
    ///
    /// A player already sitting there keeps their seat.
    pub fn seat_change(
        &mut self,
        player_id: PlayerId,
        to_table: TableId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Seating> {
        self.open_table(to_table)?;
        let player = self.player(player_id)?;
        if !player.is_active() {
            return Err(TournamentError::InvalidTransition(format!(
                "player {} is eliminated",
                player_id
            )));
        }
        if let (Some(table_id), Some(seat)) = (player.table_id, player.seat)
            && table_id == to_table
        {
            return Ok(Seating {
                player_id,
                pseudo: player.pseudo.clone(),
                table_id,
                seat,
            });
        }

        let seat = self.free_seat(to_table)?;
        let seating = self.seat_player(player_id, to_table, seat, now)?;
        self.validate_seating()?;
        Ok(seating)
    }

    /// Close a table, unseating anyone still on it
    fn close_table(&mut self, table_id: TableId, now: DateTime<Utc>) -> TournamentResult<()> {
        let remaining: Vec<PlayerId> = self.seated_at(table_id).map(|p| p.id).collect();
        for id in remaining {
            self.player_mut(id)?.unseat(now);
        }
        self.table_mut(table_id)?.closed = true;
        self.updated_at = now;
        log::debug!("[{}] table {} closed", self.code, table_id);
        Ok(())
    }

    /// Check every seat in the aggregate: range, uniqueness, open tables only,
    /// eliminated players unseated
    pub fn validate_seating(&self) -> TournamentResult<()> {
        let seats = self.seats_per_table();
        let mut taken: HashSet<(TableId, u32)> = HashSet::new();

        for player in &self.players {
            match (player.table_id, player.seat) {
                (None, None) => {}
                (Some(table_id), Some(seat)) => {
                    let closed = self.table(table_id)?.closed;
                    if player.eliminated
                        || closed
                        || seat == 0
                        || seat > seats
                        || !taken.insert((table_id, seat))
                    {
                        return Err(TournamentError::SeatInvariant { table_id, seat });
                    }
                }
                (table_id, seat) => {
                    return Err(TournamentError::SeatInvariant {
                        table_id: table_id.unwrap_or_default(),
                        seat: seat.unwrap_or_default(),
                    });
                }
            }
        }
        Ok(())
    }
}
