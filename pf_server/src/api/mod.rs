//! HTTP/WebSocket API for the tournament floor.
//!
//! # Modules
//!
//! - [`tournaments`]: creation, public views, joining and every admin command
//! - [`websocket`]: live event feed for a tournament
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                          - Health check
//! POST   /api/tournaments                                 - Create, returns code + admin token
//! GET    /api/tournaments/{code}                          - Public snapshot
//! GET    /api/tournaments/{code}/admin                    - Admin view (auth)
//! GET    /api/tournaments/{code}/leaderboard              - Ranking
//! POST   /api/tournaments/{code}/join                     - Join by pseudo
//! DELETE /api/tournaments/{code}/players/{player_id}      - Remove player (auth)
//! POST   /api/tournaments/{code}/start|pause|resume       - Clock (auth)
//! POST   /api/tournaments/{code}/next-level|reset-clock   - Clock (auth)
//! POST   /api/tournaments/{code}/eliminate                - Eliminate or rebuy (auth)
//! POST   /api/tournaments/{code}/seat-change              - Move one player (auth)
//! POST   /api/tournaments/{code}/assign-seats             - Seat everyone unseated (auth)
//! POST   /api/tournaments/{code}/close-table              - Break with a mapping (auth)
//! POST   /api/tournaments/{code}/full-redistribute        - Break at random (auth)
//! POST   /api/tournaments/{code}/final-table              - Consolidate (auth)
//! GET    /ws/{code}?role=player|admin&token=<token>       - Event feed
//! ```
//!
//! Admin routes expect `Authorization: Bearer <admin token>`.

pub mod tournaments;
pub mod websocket;

use axum::{
    Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use poker_floor::{ErrorKind, TournamentError, TournamentManager, notify::NotificationHub};
use serde_json::json;
use tower_http::cors::CorsLayer;

pub use websocket::ConnectionRegistry;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Every field is a cheap handle, so the state is cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub manager: TournamentManager,
    pub hub: NotificationHub,
    pub connections: ConnectionRegistry,
}

impl AppState {
    pub fn new(manager: TournamentManager, hub: NotificationHub) -> Self {
        Self {
            manager,
            hub,
            connections: ConnectionRegistry::new(),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use pf_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let tournament_routes = Router::new()
        .route("/{code}", get(tournaments::get_tournament))
        .route("/{code}/admin", get(tournaments::get_admin_view))
        .route("/{code}/leaderboard", get(tournaments::get_leaderboard))
        .route("/{code}/join", post(tournaments::join_tournament))
        .route(
            "/{code}/players/{player_id}",
            delete(tournaments::remove_player),
        )
        .route("/{code}/start", post(tournaments::start))
        .route("/{code}/pause", post(tournaments::pause))
        .route("/{code}/resume", post(tournaments::resume))
        .route("/{code}/next-level", post(tournaments::next_level))
        .route("/{code}/reset-clock", post(tournaments::reset_clock))
        .route("/{code}/eliminate", post(tournaments::eliminate_or_rebuy))
        .route("/{code}/seat-change", post(tournaments::seat_change))
        .route("/{code}/assign-seats", post(tournaments::assign_seats))
        .route("/{code}/close-table", post(tournaments::close_table))
        .route(
            "/{code}/full-redistribute",
            post(tournaments::full_redistribute),
        )
        .route("/{code}/final-table", post(tournaments::final_table));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{code}", get(websocket::websocket_handler))
        .route("/api/tournaments", post(tournaments::create_tournament))
        .nest("/api/tournaments", tournament_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "watchers": state.connections.len(),
    }))
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError(pub TournamentError);

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        ApiError(err)
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::InvalidStateTransition | ErrorKind::CapacityExceeded => StatusCode::CONFLICT,
        ErrorKind::RebuyNotAllowed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wire name of an error kind
pub fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::Unauthorized => "unauthorized",
        ErrorKind::InvalidStateTransition => "invalid_state_transition",
        ErrorKind::CapacityExceeded => "capacity_exceeded",
        ErrorKind::RebuyNotAllowed => "rebuy_not_allowed",
        ErrorKind::InvalidInput => "invalid_input",
        ErrorKind::Internal => "internal",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if kind == ErrorKind::Internal {
            tracing::error!("Internal error: {}", self.0);
        }
        let body = Json(json!({
            "error": kind_name(kind),
            "message": self.0.client_message(),
        }));
        (status_for(kind), body).into_response()
    }
}

/// Admin token taken from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AdminToken(pub String);

impl<S> FromRequestParts<S> for AdminToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError(TournamentError::Unauthorized))?;

        Ok(AdminToken(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(ErrorKind::CapacityExceeded),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(ErrorKind::RebuyNotAllowed),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_bearer_extraction() {
        let (mut parts, _) = Request::builder()
            .header(AUTHORIZATION, "Bearer s3cret ")
            .body(())
            .unwrap()
            .into_parts();
        let AdminToken(token) = AdminToken::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(token, "s3cret");
    }

    #[tokio::test]
    async fn test_missing_bearer_is_unauthorized() {
        let (mut parts, _) = Request::builder()
            .header(AUTHORIZATION, "Basic abc")
            .body(())
            .unwrap()
            .into_parts();
        let err = AdminToken::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.0.kind(), ErrorKind::Unauthorized);
    }
}
