//! Fire-and-forget fan-out of tournament events.

use crate::tournament::events::TournamentEvent;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc;

/// Default per-watcher buffer
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Publish side of the notification channel. Never fails the caller.
pub trait Notifier: Send + Sync {
    fn publish(&self, code: &str, event: TournamentEvent);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn publish(&self, _code: &str, _event: TournamentEvent) {}
}

pub type SubscriberId = u64;

type Subscribers = HashMap<String, HashMap<SubscriberId, mpsc::Sender<TournamentEvent>>>;

/// In-process hub: bounded channel per watcher, grouped by room code.
///
/// Slow or gone watchers are dropped on the next publish.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    subscribers: Arc<Mutex<Subscribers>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(SUBSCRIBER_BUFFER)
    }
}

impl NotificationHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start receiving events for `code`
    pub fn subscribe(&self, code: &str) -> (SubscriberId, mpsc::Receiver<TournamentEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.lock()
            .entry(code.to_string())
            .or_default()
            .insert(id, tx);
        log::debug!("[{}] watcher {} subscribed", code, id);
        (id, rx)
    }

    pub fn unsubscribe(&self, code: &str, id: SubscriberId) {
        let mut subscribers = self.lock();
        if let Some(watchers) = subscribers.get_mut(code) {
            watchers.remove(&id);
            if watchers.is_empty() {
                subscribers.remove(code);
            }
        }
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.lock().get(code).map_or(0, HashMap::len)
    }
}

impl Notifier for NotificationHub {
    fn publish(&self, code: &str, event: TournamentEvent) {
        let mut subscribers = self.lock();
        let Some(watchers) = subscribers.get_mut(code) else {
            return;
        };

        watchers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("[{}] watcher {} lagging, dropping it", code, id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if watchers.is_empty() {
            subscribers.remove(code);
        }
    }
}

/// Keeps every published event, for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<(String, TournamentEvent)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, TournamentEvent)> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Event names in publish order
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|(_, e)| e.name()).collect()
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, code: &str, event: TournamentEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push((code.to_string(), event)),
            Err(poisoned) => poisoned.into_inner().push((code.to_string(), event)),
        }
    }
}
