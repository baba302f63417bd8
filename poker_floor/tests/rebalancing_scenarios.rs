//! Rebalancing scenarios driven through the manager
//!
//! Each test seats a field, eliminates players and checks which instruction
//! the floor receives and that carrying it out keeps the seating valid.

use chrono::{TimeZone, Utc};
use poker_floor::{
    db::InMemoryTournamentRepository,
    notify::RecordingNotifier,
    random::SeededRandom,
    time::ManualTime,
    tournament::{
        CreatedTournament, PlayerId, RebalanceInstruction, TableId, Tournament, TournamentConfig,
        TournamentManager, TournamentState,
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;

fn manager(seed: u64) -> (TournamentManager, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let manager = TournamentManager::new(
        Arc::new(InMemoryTournamentRepository::new()),
        Arc::new(notifier.clone()),
    )
    .with_random(Arc::new(SeededRandom::new(seed)))
    .with_time(Arc::new(ManualTime::new(
        Utc.with_ymd_and_hms(2026, 2, 7, 21, 0, 0).unwrap(),
    )));
    (manager, notifier)
}

/// Create, fill, seat and start
async fn seated(
    manager: &TournamentManager,
    tables: u32,
    seats: u32,
    players: usize,
) -> CreatedTournament {
    let config = TournamentConfig::standard("Rebalance".to_string(), tables, seats);
    let created = manager.create(config).await.unwrap();
    for i in 0..players {
        manager
            .join(&created.code, &format!("p{:02}", i))
            .await
            .unwrap();
    }
    manager
        .assign_unseated_players(&created.code, &created.admin_token)
        .await
        .unwrap();
    manager
        .start(&created.code, &created.admin_token)
        .await
        .unwrap();
    created
}

async fn current(manager: &TournamentManager, code: &str) -> Tournament {
    manager.snapshot(code).await.unwrap().tournament
}

fn players_at(t: &Tournament, table_id: TableId) -> Vec<PlayerId> {
    let mut ids: Vec<PlayerId> = t.seated_at(table_id).map(|p| p.id).collect();
    ids.sort_unstable();
    ids
}

fn occupancy(t: &Tournament) -> Vec<usize> {
    t.tables.iter().map(|tb| t.occupancy(tb.id)).collect()
}

#[tokio::test]
async fn test_one_short_without_room_does_nothing() {
    let (manager, notifier) = manager(1);
    let created = seated(&manager, 3, 6, 15).await;
    let (code, token) = (created.code.as_str(), created.admin_token.as_str());
    let t = current(&manager, code).await;
    assert_eq!(occupancy(&t), vec![5, 5, 5]);

    let victim = players_at(&t, 1)[0];
    let instruction = manager
        .eliminate_or_rebuy(code, token, victim, false)
        .await
        .unwrap();
    assert!(instruction.is_none());
    assert!(!notifier.names().contains(&"rebalancingNeeded"));

    let t = current(&manager, code).await;
    assert_eq!(t.state, TournamentState::Running);
    assert_eq!(occupancy(&t), vec![4, 5, 5]);
}

#[tokio::test]
async fn test_short_table_is_broken() {
    let (manager, notifier) = manager(2);
    let created = seated(&manager, 3, 9, 15).await;
    let (code, token) = (created.code.as_str(), created.admin_token.as_str());
    let t = current(&manager, code).await;

    let victim = players_at(&t, 1)[0];
    let instruction = manager
        .eliminate_or_rebuy(code, token, victim, false)
        .await
        .unwrap();
    let Some(RebalanceInstruction::CloseTable {
        from_table,
        players,
        ..
    }) = instruction
    else {
        panic!("expected a table break, got {:?}", instruction);
    };
    assert_eq!(from_table, 1);
    assert_eq!(players.len(), 4);
    assert!(notifier.names().contains(&"rebalancingNeeded"));
    assert_eq!(current(&manager, code).await.state, TournamentState::Paused);

    let seatings = manager.full_redistribute(code, token, 1).await.unwrap();
    assert_eq!(seatings.len(), 4);
    manager.resume(code, token).await.unwrap();

    let t = current(&manager, code).await;
    assert!(t.table(1).unwrap().closed);
    assert_eq!(occupancy(&t), vec![0, 7, 7]);
    t.validate_seating().unwrap();
    assert!(notifier.names().contains(&"tableRedistributed"));
}

#[tokio::test]
async fn test_final_table_consolidation() {
    let (manager, notifier) = manager(3);
    let created = seated(&manager, 2, 9, 10).await;
    let (code, token) = (created.code.as_str(), created.admin_token.as_str());
    let t = current(&manager, code).await;

    let victim = players_at(&t, 1)[0];
    let instruction = manager
        .eliminate_or_rebuy(code, token, victim, false)
        .await
        .unwrap();
    let Some(RebalanceInstruction::FinalTable { table_id, player_ids }) = instruction else {
        panic!("expected final table, got {:?}", instruction);
    };
    // The short table is the target
    let t = current(&manager, code).await;
    let short = if t.occupancy(1) <= t.occupancy(2) { 1 } else { 2 };
    assert_eq!(table_id, short);
    assert_eq!(player_ids.len(), 9);

    manager
        .final_table_consolidate(code, token, table_id)
        .await
        .unwrap();
    let t = current(&manager, code).await;
    assert_eq!(t.open_tables().count(), 1);
    assert_eq!(t.occupancy(table_id), 9);
    t.validate_seating().unwrap();
    assert!(notifier.names().contains(&"finalTableRedistributed"));
}

#[tokio::test]
async fn test_tied_short_tables_move_one() {
    let (manager, _) = manager(4);
    let created = seated(&manager, 3, 9, 12).await;
    let (code, token) = (created.code.as_str(), created.admin_token.as_str());
    let t = current(&manager, code).await;
    assert_eq!(occupancy(&t), vec![4, 4, 4]);

    // Shape the field into [3, 2, 7]
    manager
        .seat_change(code, token, players_at(&t, 1)[0], 3)
        .await
        .unwrap();
    for id in &players_at(&t, 2)[..2] {
        manager.seat_change(code, token, *id, 3).await.unwrap();
    }
    let t = current(&manager, code).await;
    assert_eq!(occupancy(&t), vec![3, 2, 7]);

    let victim = players_at(&t, 1)[0];
    let instruction = manager
        .eliminate_or_rebuy(code, token, victim, false)
        .await
        .unwrap();
    let Some(RebalanceInstruction::MoveOne {
        from_table,
        to_table,
        candidates,
    }) = instruction
    else {
        panic!("expected a single move, got {:?}", instruction);
    };
    assert_eq!((from_table, to_table), (3, 1));
    assert_eq!(candidates.len(), 7);

    let seating = manager
        .seat_change(code, token, candidates[0].id, to_table)
        .await
        .unwrap();
    assert_eq!(seating.table_id, 1);
    let t = current(&manager, code).await;
    assert_eq!(occupancy(&t), vec![3, 2, 6]);
}

#[tokio::test]
async fn test_floor_simulation_keeps_invariants() {
    for seed in 0..8u64 {
        let (manager, _) = manager(seed);
        let created = seated(&manager, 4, 8, 30).await;
        let (code, token) = (created.code.as_str(), created.admin_token.as_str());
        let mut picker = StdRng::seed_from_u64(seed);

        for _ in 0..40 {
            let t = current(&manager, code).await;
            if t.state == TournamentState::Finished {
                break;
            }
            let active: Vec<PlayerId> = t.active_players().map(|p| p.id).collect();
            let victim = active[picker.random_range(0..active.len())];

            let instruction = manager
                .eliminate_or_rebuy(code, token, victim, false)
                .await
                .unwrap();
            match instruction {
                Some(RebalanceInstruction::FinalTable { table_id, .. }) => {
                    manager
                        .final_table_consolidate(code, token, table_id)
                        .await
                        .unwrap();
                }
                Some(RebalanceInstruction::CloseTable { from_table, .. }) => {
                    manager
                        .full_redistribute(code, token, from_table)
                        .await
                        .unwrap();
                }
                Some(RebalanceInstruction::MoveOne {
                    to_table,
                    candidates,
                    ..
                }) => {
                    manager
                        .seat_change(code, token, candidates[0].id, to_table)
                        .await
                        .unwrap();
                }
                None => {}
            }

            let t = current(&manager, code).await;
            t.validate_seating().unwrap();
            let open = t.open_tables().count();
            let seated = t.active_players().filter(|p| p.is_seated()).count();
            assert!(seated <= open * t.seats_per_table() as usize);
            assert_eq!(seated, t.active_count());

            if t.state == TournamentState::Paused {
                manager.resume(code, token).await.unwrap();
            }
        }

        let t = current(&manager, code).await;
        assert_eq!(t.state, TournamentState::Finished, "seed {}", seed);
        assert_eq!(t.active_count(), 1);
    }
}
