/// Property-based tests for the seat allocator and the rebalancer
///
/// These tests check the seating invariants over randomly sized fields,
/// table counts and random seeds.
use chrono::Utc;
use poker_floor::{
    random::SeededRandom,
    tournament::{RebalanceInstruction, TableId, Tournament, TournamentConfig},
};
use proptest::prelude::*;

fn field(tables: u32, seats: u32, players: usize) -> Tournament {
    let config = TournamentConfig::standard("Prop".to_string(), tables, seats);
    let mut t = Tournament::new("PROP0001".to_string(), config, Utc::now());
    for i in 0..players {
        t.register_player(&format!("prop{}", i), Utc::now()).unwrap();
    }
    t
}

fn counts(t: &Tournament) -> Vec<usize> {
    t.open_tables().map(|tb| t.occupancy(tb.id)).collect()
}

// Strategy for (tables, seats, players) with players within capacity
fn layout_strategy() -> impl Strategy<Value = (u32, u32, usize)> {
    (1u32..=6, 2u32..=10).prop_flat_map(|(tables, seats)| {
        let capacity = (tables * seats) as usize;
        (Just(tables), Just(seats), 0..=capacity)
    })
}

proptest! {
    #[test]
    fn test_assign_random_is_balanced_and_valid(
        (tables, seats, players) in layout_strategy(),
        seed in any::<u64>(),
    ) {
        let mut t = field(tables, seats, players);
        let rng = SeededRandom::new(seed);
        let seatings = t.assign_random(&rng, Utc::now()).unwrap();

        prop_assert_eq!(seatings.len(), players);
        prop_assert!(t.validate_seating().is_ok());

        let c = counts(&t);
        let max = c.iter().copied().max().unwrap_or(0);
        let min = c.iter().copied().min().unwrap_or(0);
        prop_assert!(max - min <= 1, "spread {:?}", c);
        for seating in &seatings {
            prop_assert!(seating.seat >= 1 && seating.seat <= seats);
        }
    }

    #[test]
    fn test_final_table_holds_everyone(
        tables in 1u32..=5,
        seats in 2u32..=10,
        seed in any::<u64>(),
        fill in 0.0f64..=1.0,
    ) {
        let players = ((seats as f64) * fill).floor() as usize;
        let mut t = field(tables, seats, players);
        let rng = SeededRandom::new(seed);
        t.assign_random(&rng, Utc::now()).unwrap();

        let target = t.tables.last().unwrap().id;
        t.final_table_consolidate(target, &rng, Utc::now()).unwrap();

        prop_assert_eq!(t.open_tables().count(), 1);
        prop_assert_eq!(t.occupancy(target), players);
        prop_assert!(t.validate_seating().is_ok());
    }

    #[test]
    fn test_rebalance_instructions_are_actionable(
        (tables, seats, players) in layout_strategy(),
        seed in any::<u64>(),
        busts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let mut t = field(tables, seats, players);
        let rng = SeededRandom::new(seed);
        t.assign_random(&rng, Utc::now()).unwrap();

        // Bust players straight off their seats to reach uneven layouts
        for bust in busts {
            let seated: Vec<_> = t.active_players().filter(|p| p.is_seated()).map(|p| p.id).collect();
            if seated.is_empty() {
                break;
            }
            let id = seated[bust.index(seated.len())];
            let player = t.players.iter_mut().find(|p| p.id == id).unwrap();
            player.eliminated = true;
            player.table_id = None;
            player.seat = None;
        }

        let before = counts(&t);
        match t.evaluate_rebalance() {
            Some(RebalanceInstruction::FinalTable { table_id, .. }) => {
                prop_assert!(t.active_count() <= seats as usize);
                prop_assert!(t.final_table_consolidate(table_id, &rng, Utc::now()).is_ok());
            }
            Some(RebalanceInstruction::CloseTable { from_table, .. }) => {
                let min = before.iter().copied().filter(|c| *c > 0).min().unwrap();
                prop_assert_eq!(t.occupancy(from_table), min);
                prop_assert!(t.full_redistribute(from_table, &rng, Utc::now()).is_ok());
            }
            Some(RebalanceInstruction::MoveOne { from_table, to_table, candidates }) => {
                prop_assert!(t.occupancy(from_table) > t.occupancy(to_table) + 1);
                let mover = candidates[0].id;
                prop_assert!(t.seat_change(mover, to_table, Utc::now()).is_ok());
            }
            None => {
                let occupied: Vec<TableId> = t
                    .open_tables()
                    .filter(|tb| t.occupancy(tb.id) > 0)
                    .map(|tb| tb.id)
                    .collect();
                if occupied.len() > 1 {
                    prop_assert!(t.active_count() > seats as usize);
                }
            }
        }
        prop_assert!(t.validate_seating().is_ok());
    }
}
