//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the registry and services.
//! Malformed JSON bodies are mapped to the standard `{error, code}` shape
//! instead of axum's default plain-text rejection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::api::response::{api_error, api_message, api_success};
use crate::api::ws::join_room_handler;
use crate::api::AppState;
use crate::error::{JamError, JamResult};

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    user_name: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    user_name: String,
    room_name: String,
}

/// Shared body shape for suggest-song, vote-for-song, and skip-song.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SongActionRequest {
    room_name: String,
    song_name: String,
    connection_id: String,
}

/// Unwraps a JSON body, mapping rejections to the standard error shape.
fn require_json<T>(payload: Result<Json<T>, JsonRejection>) -> JamResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|_| JamError::InvalidRequest("Invalid request payload".into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Only room creation is bearer-gated; joining and the in-room actions
    // authenticate by possession of the encrypted connection-id.
    let protected = Router::new()
        .route("/create-room", post(create_room))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/join-room", get(join_room_handler))
        .route("/suggest-song", post(suggest_song))
        .route("/vote-for-song", post(vote_for_song))
        .route("/skip-song", post(skip_song))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Rejects requests without a valid bearer token from the login endpoint.
async fn require_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    match state.auth.authorize(header) {
        Ok(session) => {
            log::debug!("[Auth] '{}' authorized", session.user_name);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Health probe covering the key-value dependency.
async fn health_check(State(state): State<AppState>) -> Response {
    match state.kv.ping().await {
        Ok(()) => api_success(json!({ "service": "ok", "kv": "connected" })),
        Err(e) => {
            log::warn!("[Health] Key-value ping failed: {}", e);
            api_error(StatusCode::SERVICE_UNAVAILABLE, "kv_unreachable", e)
        }
    }
}

/// POST /login
///
/// Validates credentials and returns the bearer token for create-room.
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> JamResult<Response> {
    let payload = require_json(payload)?;
    let token = state.auth.login(&payload.user_name, &payload.password)?;
    Ok(api_success(json!({ "token": token })))
}

/// POST /create-room (bearer-gated)
///
/// Registers the room and starts its broadcaster; the host still has to
/// join over `/join-room` before guests are admitted.
async fn create_room(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> JamResult<Response> {
    let payload = require_json(payload)?;
    let host = state
        .rooms
        .add_room(&payload.room_name, &payload.user_name)?;
    log::info!("Room created successfully with name: {}", payload.room_name);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "host": host, "roomName": payload.room_name })),
    )
        .into_response())
}

/// POST /suggest-song
async fn suggest_song(
    State(state): State<AppState>,
    payload: Result<Json<SongActionRequest>, JsonRejection>,
) -> JamResult<Response> {
    let p = require_json(payload)?;
    state
        .rooms
        .suggest_song(&p.song_name, &p.room_name, &p.connection_id)?;
    Ok(api_message(StatusCode::CREATED, "Song Suggested successfully"))
}

/// POST /vote-for-song
async fn vote_for_song(
    State(state): State<AppState>,
    payload: Result<Json<SongActionRequest>, JsonRejection>,
) -> JamResult<Response> {
    let p = require_json(payload)?;
    state
        .rooms
        .vote_for_song(&p.song_name, &p.room_name, &p.connection_id)?;
    Ok(api_message(StatusCode::CREATED, "Vote casted successfully"))
}

/// POST /skip-song
async fn skip_song(
    State(state): State<AppState>,
    payload: Result<Json<SongActionRequest>, JsonRejection>,
) -> JamResult<Response> {
    let p = require_json(payload)?;
    state
        .rooms
        .skip_song(&p.song_name, &p.room_name, &p.connection_id)?;
    Ok(api_message(StatusCode::CREATED, "Song Skipped successfully"))
}
