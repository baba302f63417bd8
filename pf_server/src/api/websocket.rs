//! WebSocket feed of tournament events.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{code}?role=player`, `role=screen` for a
//!    display board, or `role=admin&token=<admin token>`
//! 2. Server checks the tournament exists (and the token for admins), then upgrades
//! 3. The connection is recorded in the [`ConnectionRegistry`] and subscribed to the hub
//! 4. Server sends a `tournamentStateUpdated` snapshot, then every event as it is published
//! 5. On disconnect, or when the hub drops a lagging watcher, both tasks stop and
//!    the registry entry is removed
//!
//! # Client Messages
//!
//! Screens are read-only and their messages are ignored. Players and admins may send:
//!
//! ```json
//! {"type": "snapshot"}
//! {"type": "leaderboard"}
//! ```
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/A1B2C3D4?role=player');
//!
//! ws.onmessage = (msg) => {
//!   const { event, payload } = JSON.parse(msg.data);
//!   if (event === 'blindsUp') {
//!     showLevel(payload.level);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use poker_floor::{TournamentError, TournamentEvent};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::{logging::log_watcher, metrics};

/// What a watcher is allowed to see
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherRole {
    #[default]
    Player,
    Admin,
    /// Display board in the room, receives the feed only
    Screen,
}

impl WatcherRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatcherRole::Player => "player",
            WatcherRole::Admin => "admin",
            WatcherRole::Screen => "screen",
        }
    }

    /// Whether client requests on this connection get an answer
    pub fn answers_requests(&self) -> bool {
        !matches!(self, WatcherRole::Screen)
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    role: WatcherRole,
    token: Option<String>,
}

/// One live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub code: String,
    pub role: WatcherRole,
    pub connected_at: DateTime<Utc>,
}

/// Live connections keyed by session id.
///
/// Lives only in memory; clients re-register on reconnect.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<Uuid, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Connection>> {
        match self.connections.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a new connection and return its session id
    pub fn register(&self, code: &str, role: WatcherRole) -> Uuid {
        let session_id = Uuid::new_v4();
        self.lock().insert(
            session_id,
            Connection {
                code: code.to_string(),
                role,
                connected_at: Utc::now(),
            },
        );
        session_id
    }

    pub fn remove(&self, session_id: &Uuid) -> Option<Connection> {
        self.lock().remove(session_id)
    }

    pub fn get(&self, session_id: &Uuid) -> Option<Connection> {
        self.lock().get(session_id).cloned()
    }

    /// Connections currently following `code`
    pub fn watching(&self, code: &str) -> usize {
        self.lock().values().filter(|c| c.code == code).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Requests a client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Resend the full snapshot
    Snapshot,
    /// Send the current ranking
    Leaderboard,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerError {
    Error { message: String },
}

/// Upgrade to a WebSocket following one tournament.
///
/// Responds `404` for an unknown code and `401` when an admin connection
/// presents a missing or wrong token.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let admitted = match query.role {
        WatcherRole::Player | WatcherRole::Screen => {
            state.manager.snapshot(&code).await.map(|_| ())
        }
        WatcherRole::Admin => match &query.token {
            Some(token) => state.manager.authorize(&code, token).await,
            None => Err(TournamentError::Unauthorized),
        },
    };
    if let Err(e) = admitted {
        return ApiError(e).into_response();
    }

    let role = query.role;
    ws.on_upgrade(move |socket| handle_socket(socket, code, role, state))
}

fn encode<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize websocket message: {}", e);
            None
        }
    }
}

/// Answer a client request with the matching event
async fn answer(state: &AppState, code: &str, text: &str) -> Option<String> {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Snapshot) => state
            .manager
            .snapshot(code)
            .await
            .map(|snapshot| TournamentEvent::TournamentStateUpdated(Box::new(snapshot))),
        Ok(ClientMessage::Leaderboard) => state
            .manager
            .leaderboard(code)
            .await
            .map(TournamentEvent::LeaderboardUpdated),
        Err(e) => {
            tracing::warn!("Failed to parse client message: {}", e);
            return encode(&ServerError::Error {
                message: "Invalid message format".to_string(),
            });
        }
    };

    match reply {
        Ok(event) => encode(&event),
        Err(e) => encode(&ServerError::Error {
            message: e.client_message(),
        }),
    }
}

/// Drive an established connection until either side goes away
async fn handle_socket(socket: WebSocket, code: String, role: WatcherRole, state: AppState) {
    let session_id = state.connections.register(&code, role);
    let session = session_id.to_string();
    let (subscriber_id, mut events) = state.hub.subscribe(&code);
    log_watcher(&code, &session, role.as_str(), true);
    metrics::websocket_connections_total(role.as_str());
    metrics::websocket_watchers_active(state.connections.len());

    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(16);

    // Events published before this point are covered by the snapshot
    if let Some(json) = answer(&state, &code, r#"{"type":"snapshot"}"#).await {
        let _ = reply_tx.send(json).await;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let json = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => encode(&event),
                    // Dropped by the hub
                    None => break,
                },
                Some(reply) = reply_rx.recv() => Some(reply),
            };
            if let Some(json) = json
                && sender.send(Message::Text(json.into())).await.is_err()
            {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_code = code.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(_)) if !role.answers_requests() => {}
                Ok(Message::Text(text)) => {
                    if let Some(json) = answer(&recv_state, &recv_code, &text).await
                        && reply_tx.send(json).await.is_err()
                    {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unsubscribe(&code, subscriber_id);
    state.connections.remove(&session_id);
    metrics::websocket_watchers_active(state.connections.len());
    log_watcher(&code, &session, role.as_str(), false);
}
