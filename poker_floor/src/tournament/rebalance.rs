//! Rebalancing engine.
//!
//! Looks at table occupancy after an elimination and decides whether players
//! have to move. Rules are tried in order, the first match wins:
//!
//! 1. active seated players already share one table: nothing to do
//! 2. active players fit on one table: consolidate on the least populated open table
//! 3. a single open table holds the strict minimum and the others can absorb
//!    it: close that table and redistribute. If the others cannot absorb it,
//!    nothing happens in this pass.
//! 4. occupancy spread above one: move one player from the fullest to the
//!    emptiest open table
//!
//! Every instruction pauses a running clock so the floor can carry it out.

use super::{
    errors::TournamentResult,
    models::{PlayerId, TableId, Tournament, TournamentState},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Player reference shown to the floor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub pseudo: String,
    pub name: String,
}

/// Destination table with its free seat count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRoom {
    pub table_id: TableId,
    pub free_seats: usize,
}

/// What the floor should do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RebalanceInstruction {
    /// Bring everyone to `table_id`
    FinalTable {
        table_id: TableId,
        player_ids: Vec<PlayerId>,
    },
    /// Close `from_table` and spread its players over `to_tables`
    CloseTable {
        from_table: TableId,
        players: Vec<PlayerRef>,
        to_tables: Vec<TableRoom>,
    },
    /// Move one of `candidates` from `from_table` to `to_table`
    MoveOne {
        from_table: TableId,
        to_table: TableId,
        candidates: Vec<PlayerRef>,
    },
}

impl Tournament {
    fn player_refs_at(&self, table_id: TableId) -> Vec<PlayerRef> {
        let mut refs: Vec<PlayerRef> = self
            .seated_at(table_id)
            .map(|p| PlayerRef {
                id: p.id,
                pseudo: p.pseudo.clone(),
                name: p.name.clone(),
            })
            .collect();
        refs.sort_by_key(|r| r.id);
        refs
    }

    /// Decide what, if anything, has to move. Pure.
    pub fn evaluate_rebalance(&self) -> Option<RebalanceInstruction> {
        let occupied: HashSet<TableId> = self
            .active_players()
            .filter(|p| p.is_seated())
            .filter_map(|p| p.table_id)
            .collect();
        if occupied.len() <= 1 {
            return None;
        }

        let seats = self.seats_per_table() as usize;
        let counts: Vec<(TableId, usize)> = self
            .open_tables()
            .map(|t| (t.id, self.occupancy(t.id)))
            .collect();

        // Final table: first of the least populated open tables
        if self.active_count() <= seats {
            let (table_id, _) = counts.iter().copied().min_by_key(|&(_, count)| count)?;
            let mut player_ids: Vec<PlayerId> = self.active_players().map(|p| p.id).collect();
            player_ids.sort_unstable();
            return Some(RebalanceInstruction::FinalTable {
                table_id,
                player_ids,
            });
        }

        // Minority closure over occupied open tables
        let occupied_counts: Vec<(TableId, usize)> = counts
            .iter()
            .copied()
            .filter(|(_, count)| *count > 0)
            .collect();
        if occupied_counts.len() <= 1 {
            return None;
        }
        let min = occupied_counts.iter().map(|(_, c)| *c).min()?;
        let mut minima = occupied_counts.iter().filter(|(_, c)| *c == min);
        if let (Some(&(from_table, occupants)), None) = (minima.next(), minima.next()) {
            let to_tables: Vec<TableRoom> = counts
                .iter()
                .filter(|(id, _)| *id != from_table)
                .map(|&(table_id, count)| TableRoom {
                    table_id,
                    free_seats: seats.saturating_sub(count),
                })
                .collect();
            let room: usize = to_tables.iter().map(|t| t.free_seats).sum();
            if room < occupants {
                log::debug!(
                    "[{}] table {} is the minority but only {} seats are free elsewhere",
                    self.code,
                    from_table,
                    room
                );
                return None;
            }
            return Some(RebalanceInstruction::CloseTable {
                from_table,
                players: self.player_refs_at(from_table),
                to_tables,
            });
        }

        // Single-seat move across all open tables
        let mut fullest = counts.first().copied()?;
        let mut emptiest = fullest;
        for &(id, count) in &counts {
            if count > fullest.1 {
                fullest = (id, count);
            }
            if count < emptiest.1 {
                emptiest = (id, count);
            }
        }
        if fullest.1 - emptiest.1 > 1 {
            return Some(RebalanceInstruction::MoveOne {
                from_table: fullest.0,
                to_table: emptiest.0,
                candidates: self.player_refs_at(fullest.0),
            });
        }

        None
    }

    /// Evaluate and pause a running clock when something has to move
    pub(crate) fn rebalance(
        &mut self,
        now: DateTime<Utc>,
    ) -> TournamentResult<Option<RebalanceInstruction>> {
        let instruction = self.evaluate_rebalance();
        if instruction.is_some() && self.state == TournamentState::Running {
            self.pause(now)?;
        }
        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::TournamentConfig;

    /// Tables numbered from 1 with the given occupancy
    fn layout(seats: u32, occupancy: &[usize]) -> Tournament {
        let config =
            TournamentConfig::standard("Rebalance".to_string(), occupancy.len() as u32, seats);
        let mut t = Tournament::new("REBAL001".to_string(), config, Utc::now());
        for (index, &count) in occupancy.iter().enumerate() {
            let table_id = index as TableId + 1;
            for seat in 1..=count as u32 {
                let id = t
                    .register_player(&format!("t{}s{}", table_id, seat), Utc::now())
                    .unwrap()
                    .id;
                let player = t.player_mut(id).unwrap();
                player.table_id = Some(table_id);
                player.seat = Some(seat);
            }
        }
        t
    }

    #[test]
    fn test_single_table_needs_nothing() {
        assert_eq!(layout(9, &[6, 0]).evaluate_rebalance(), None);
        assert_eq!(layout(9, &[0, 0]).evaluate_rebalance(), None);
    }

    #[test]
    fn test_final_table_trigger() {
        let t = layout(9, &[2, 7]);
        match t.evaluate_rebalance() {
            Some(RebalanceInstruction::FinalTable {
                table_id,
                player_ids,
            }) => {
                assert_eq!(table_id, 1);
                assert_eq!(player_ids.len(), 9);
            }
            other => panic!("expected final table, got {:?}", other),
        }
    }

    #[test]
    fn test_final_table_tie_takes_first() {
        let t = layout(9, &[3, 2, 2]);
        assert!(matches!(
            t.evaluate_rebalance(),
            Some(RebalanceInstruction::FinalTable { table_id: 2, .. })
        ));
    }

    #[test]
    fn test_final_table_may_target_empty_table() {
        let t = layout(9, &[0, 4, 4]);
        assert!(matches!(
            t.evaluate_rebalance(),
            Some(RebalanceInstruction::FinalTable { table_id: 1, .. })
        ));
    }

    #[test]
    fn test_unique_minority_closes() {
        let t = layout(9, &[3, 5, 5]);
        match t.evaluate_rebalance() {
            Some(RebalanceInstruction::CloseTable {
                from_table,
                players,
                to_tables,
            }) => {
                assert_eq!(from_table, 1);
                assert_eq!(players.len(), 3);
                assert_eq!(
                    to_tables,
                    vec![
                        TableRoom {
                            table_id: 2,
                            free_seats: 4
                        },
                        TableRoom {
                            table_id: 3,
                            free_seats: 4
                        },
                    ]
                );
            }
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn test_minority_without_room_does_not_escalate() {
        // 4 on table 1 cannot fit in the 2 free seats elsewhere
        assert_eq!(layout(6, &[4, 5, 5]).evaluate_rebalance(), None);
        // Spread of 4 would trigger a move, but the minority rule stops first
        assert_eq!(layout(7, &[2, 6, 7, 7]).evaluate_rebalance(), None);
    }

    #[test]
    fn test_tied_minority_moves_one() {
        let t = layout(9, &[2, 2, 7]);
        match t.evaluate_rebalance() {
            Some(RebalanceInstruction::MoveOne {
                from_table,
                to_table,
                candidates,
            }) => {
                assert_eq!(from_table, 3);
                assert_eq!(to_table, 1);
                assert_eq!(candidates.len(), 7);
            }
            other => panic!("expected move-one, got {:?}", other),
        }
    }

    #[test]
    fn test_balanced_tables_need_nothing() {
        assert_eq!(layout(9, &[5, 5, 6, 6]).evaluate_rebalance(), None);
    }

    #[test]
    fn test_rebalance_pauses_running_clock() {
        let mut t = layout(9, &[3, 5, 5]);
        t.start(Utc::now()).unwrap();
        let instruction = t.rebalance(Utc::now()).unwrap();
        assert!(instruction.is_some());
        assert_eq!(t.state, TournamentState::Paused);
    }

    #[test]
    fn test_no_instruction_keeps_clock_running() {
        let mut t = layout(9, &[5, 5, 5]);
        t.start(Utc::now()).unwrap();
        assert!(t.rebalance(Utc::now()).unwrap().is_none());
        assert_eq!(t.state, TournamentState::Running);
    }
}
