//! Repository trait for tournament aggregates and its PostgreSQL implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use subtle::ConstantTimeEq;

use crate::tournament::{
    errors::TournamentResult,
    models::{StateTransition, Tournament, TournamentState},
};

/// Trait for tournament storage
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Store a new tournament with its admin token
    async fn insert(&self, tournament: &Tournament, admin_token: &str) -> TournamentResult<()>;

    /// Load the aggregate for a room code
    async fn find_by_code(&self, code: &str) -> TournamentResult<Option<Tournament>>;

    /// Replace the aggregate and append `transitions` to the lifecycle log,
    /// atomically
    async fn save(
        &self,
        tournament: &Tournament,
        transitions: &[StateTransition],
    ) -> TournamentResult<()>;

    /// Check an admin token against the sessions of `code`
    async fn verify_admin(&self, code: &str, token: &str) -> TournamentResult<bool>;

    /// Room codes of every tournament currently in `state`
    async fn codes_in_state(&self, state: TournamentState) -> TournamentResult<Vec<String>>;
}

/// Constant-time token comparison
pub(crate) fn token_matches(expected: &str, given: &str) -> bool {
    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

/// Default PostgreSQL implementation of `TournamentRepository`
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn insert(&self, tournament: &Tournament, admin_token: &str) -> TournamentResult<()> {
        let document = serde_json::to_string(tournament)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tournaments (code, name, state, document, created_at, updated_at)
             VALUES ($1, $2, $3, $4::jsonb, $5, $6)",
        )
        .bind(&tournament.code)
        .bind(&tournament.config.name)
        .bind(tournament.state.as_str())
        .bind(document)
        .bind(tournament.created_at)
        .bind(tournament.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO admin_sessions (tournament_code, token) VALUES ($1, $2)")
            .bind(&tournament.code)
            .bind(admin_token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query("SELECT document::text AS document FROM tournaments WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let document: String = r.get("document");
                Ok(Some(serde_json::from_str(&document)?))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        tournament: &Tournament,
        transitions: &[StateTransition],
    ) -> TournamentResult<()> {
        let document = serde_json::to_string(tournament)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE tournaments
             SET state = $2, document = $3::jsonb, updated_at = $4
             WHERE code = $1",
        )
        .bind(&tournament.code)
        .bind(tournament.state.as_str())
        .bind(document)
        .bind(tournament.updated_at)
        .execute(&mut *tx)
        .await?;

        for transition in transitions {
            sqlx::query(
                "INSERT INTO tournament_states (tournament_code, state, recorded_at)
                 VALUES ($1, $2, $3)",
            )
            .bind(&tournament.code)
            .bind(transition.state.as_str())
            .bind(transition.recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn verify_admin(&self, code: &str, token: &str) -> TournamentResult<bool> {
        let rows = sqlx::query("SELECT token FROM admin_sessions WHERE tournament_code = $1")
            .bind(code)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .any(|r| token_matches(r.get::<&str, _>("token"), token)))
    }

    async fn codes_in_state(&self, state: TournamentState) -> TournamentResult<Vec<String>> {
        let rows = sqlx::query("SELECT code FROM tournaments WHERE state = $1 ORDER BY code")
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("code")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("abc-123", "abc-123"));
        assert!(!token_matches("abc-123", "abc-124"));
        assert!(!token_matches("abc-123", "abc-1234"));
        assert!(!token_matches("abc-123", ""));
    }
}
