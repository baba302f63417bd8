//! PostgreSQL repository tests
//!
//! These need a reachable database: set `DATABASE_URL` and run with
//! `--ignored`. They share one schema, so they run serially.

use chrono::Utc;
use poker_floor::{
    db::{Database, DatabaseConfig, PgTournamentRepository, TournamentRepository},
    tournament::{Tournament, TournamentConfig, TournamentState},
};
use serial_test::serial;
use uuid::Uuid;

async fn repository() -> PgTournamentRepository {
    let db = Database::new(&DatabaseConfig::from_env())
        .await
        .expect("Failed to connect to database");
    db.migrate().await.expect("Migration failed");
    PgTournamentRepository::new(db.pool().clone())
}

fn fresh_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(8);
    code.to_uppercase()
}

#[tokio::test]
#[ignore = "needs a running PostgreSQL (DATABASE_URL)"]
#[serial]
async fn test_insert_find_and_verify() {
    let repo = repository().await;
    let code = fresh_code();
    let config = TournamentConfig::standard("Pg".to_string(), 2, 9);
    let tournament = Tournament::new(code.clone(), config, Utc::now());

    repo.insert(&tournament, "pg-secret").await.unwrap();

    let found = repo.find_by_code(&code).await.unwrap().unwrap();
    assert_eq!(found.code, code);
    assert_eq!(found.tables.len(), 2);
    assert!(repo.verify_admin(&code, "pg-secret").await.unwrap());
    assert!(!repo.verify_admin(&code, "pg-guess").await.unwrap());
}

#[tokio::test]
#[ignore = "needs a running PostgreSQL (DATABASE_URL)"]
#[serial]
async fn test_save_tracks_state() {
    let repo = repository().await;
    let code = fresh_code();
    let config = TournamentConfig::standard("Pg".to_string(), 1, 6);
    let mut tournament = Tournament::new(code.clone(), config, Utc::now());
    repo.insert(&tournament, "pg-secret").await.unwrap();

    tournament.register_player("alice", Utc::now()).unwrap();
    tournament.start(Utc::now()).unwrap();
    repo.save(&tournament, &tournament.history).await.unwrap();

    let found = repo.find_by_code(&code).await.unwrap().unwrap();
    assert_eq!(found.state, TournamentState::Running);
    assert_eq!(found.players.len(), 1);
    assert!(
        repo.codes_in_state(TournamentState::Running)
            .await
            .unwrap()
            .contains(&code)
    );
}
