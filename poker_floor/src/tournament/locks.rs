//! Per-tournament mutual exclusion.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held for the length of one read-modify-write.
///
/// Dropping it unlocks the tournament and removes the table entry when no
/// other caller holds or waits on it.
#[derive(Debug)]
pub struct TournamentGuard {
    guard: Option<OwnedMutexGuard<()>>,
    code: String,
    locks: TournamentLocks,
}

impl Drop for TournamentGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.code);
    }
}

/// Lock table keyed by room code.
///
/// Different tournaments never contend; commands and ticks on the same
/// tournament run one at a time in arrival order.
#[derive(Debug, Default, Clone)]
pub struct TournamentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn entry(&self, code: &str) -> Arc<AsyncMutex<()>> {
        self.table()
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `code`
    pub async fn acquire(&self, code: &str) -> TournamentGuard {
        let guard = self.entry(code).lock_owned().await;
        TournamentGuard {
            guard: Some(guard),
            code: code.to_string(),
            locks: self.clone(),
        }
    }

    /// Remove `code` if only the table itself still references it
    fn release(&self, code: &str) {
        let mut locks = self.table();
        let idle = locks
            .get(code)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(code);
        }
    }

    /// Drop entries nobody holds or waits on.
    ///
    /// Catches entries left by waiters that were cancelled before locking.
    pub fn prune(&self) {
        self.table().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_code_is_exclusive() {
        let locks = TournamentLocks::new();
        let guard = locks.acquire("AAAA0000").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire("AAAA0000").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_codes_do_not_block() {
        let locks = TournamentLocks::new();
        let _a = locks.acquire("AAAA0000").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("BBBB0000")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_removed() {
        let locks = TournamentLocks::new();
        let held = locks.acquire("AAAA0000").await;
        drop(locks.acquire("BBBB0000").await);
        assert_eq!(locks.len(), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_someone_waits() {
        let locks = TournamentLocks::new();
        let held = locks.acquire("AAAA0000").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire("AAAA0000").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(locks.len(), 1);
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_prune_clears_cancelled_waiters() {
        let locks = TournamentLocks::new();
        let held = locks.acquire("AAAA0000").await;
        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), locks.acquire("AAAA0000")).await;
        assert!(cancelled.is_err());

        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
