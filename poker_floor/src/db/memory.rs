//! Process-local repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{TournamentRepository, token_matches};
use crate::tournament::{
    errors::{TournamentError, TournamentResult},
    models::{StateTransition, Tournament, TournamentState},
};

#[derive(Debug, Clone)]
struct Record {
    tournament: Tournament,
    admin_tokens: Vec<String>,
    log: Vec<StateTransition>,
}

/// Keeps every aggregate in a map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryTournamentRepository {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle log recorded for `code`
    pub async fn transitions(&self, code: &str) -> Vec<StateTransition> {
        self.records
            .read()
            .await
            .get(code)
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn insert(&self, tournament: &Tournament, admin_token: &str) -> TournamentResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&tournament.code) {
            return Err(TournamentError::InvalidConfig(format!(
                "room code {} already in use",
                tournament.code
            )));
        }
        records.insert(
            tournament.code.clone(),
            Record {
                tournament: tournament.clone(),
                admin_tokens: vec![admin_token.to_string()],
                log: Vec::new(),
            },
        );
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> TournamentResult<Option<Tournament>> {
        Ok(self
            .records
            .read()
            .await
            .get(code)
            .map(|r| r.tournament.clone()))
    }

    async fn save(
        &self,
        tournament: &Tournament,
        transitions: &[StateTransition],
    ) -> TournamentResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&tournament.code)
            .ok_or_else(|| TournamentError::NotFound(tournament.code.clone()))?;
        record.tournament = tournament.clone();
        record.log.extend_from_slice(transitions);
        Ok(())
    }

    async fn verify_admin(&self, code: &str, token: &str) -> TournamentResult<bool> {
        Ok(self.records.read().await.get(code).is_some_and(|r| {
            r.admin_tokens
                .iter()
                .any(|expected| token_matches(expected, token))
        }))
    }

    async fn codes_in_state(&self, state: TournamentState) -> TournamentResult<Vec<String>> {
        let mut codes: Vec<String> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.tournament.state == state)
            .map(|r| r.tournament.code.clone())
            .collect();
        codes.sort();
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::TournamentConfig;
    use chrono::Utc;

    fn tournament(code: &str) -> Tournament {
        let config = TournamentConfig::standard("Memory".to_string(), 2, 9);
        Tournament::new(code.to_string(), config, Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryTournamentRepository::new();
        repo.insert(&tournament("MEM00001"), "secret").await.unwrap();
        let found = repo.find_by_code("MEM00001").await.unwrap().unwrap();
        assert_eq!(found.code, "MEM00001");
        assert!(repo.find_by_code("NOPE0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let repo = InMemoryTournamentRepository::new();
        repo.insert(&tournament("MEM00001"), "a").await.unwrap();
        assert!(repo.insert(&tournament("MEM00001"), "b").await.is_err());
    }

    #[tokio::test]
    async fn test_verify_admin() {
        let repo = InMemoryTournamentRepository::new();
        repo.insert(&tournament("MEM00001"), "secret").await.unwrap();
        assert!(repo.verify_admin("MEM00001", "secret").await.unwrap());
        assert!(!repo.verify_admin("MEM00001", "guess").await.unwrap());
        assert!(!repo.verify_admin("NOPE0000", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_appends_log_and_indexes_state() {
        let repo = InMemoryTournamentRepository::new();
        let mut t = tournament("MEM00001");
        repo.insert(&t, "secret").await.unwrap();
        repo.insert(&tournament("MEM00002"), "other").await.unwrap();

        t.start(Utc::now()).unwrap();
        repo.save(&t, &t.history).await.unwrap();

        assert_eq!(repo.transitions("MEM00001").await.len(), 1);
        assert_eq!(
            repo.codes_in_state(TournamentState::Running).await.unwrap(),
            vec!["MEM00001".to_string()]
        );
        assert_eq!(
            repo.codes_in_state(TournamentState::Config).await.unwrap(),
            vec!["MEM00002".to_string()]
        );
    }
}
