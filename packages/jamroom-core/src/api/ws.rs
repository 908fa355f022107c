//! WebSocket join handler and per-client read/write loop.
//!
//! `GET /join-room?roomName=..&userName=..` upgrades to a WebSocket. The
//! join is validated atomically inside the registry after the upgrade; a
//! rejected join closes the socket with a policy-violation close frame
//! carrying the reason (the HTTP response is already committed by then).
//! An admitted client gets one task running the loop below: outbound
//! snapshots drain from the client's queue, inbound text frames are
//! relayed as chat, and any read error or stream end removes the user.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::api::AppState;
use crate::error::JamError;

/// Query parameters for the join-room upgrade request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomQuery {
    room_name: String,
    user_name: String,
}

/// WebSocket upgrade handler for `/join-room`.
pub async fn join_room_handler(
    Query(params): Query<JoinRoomQuery>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    // Fail fast with a proper HTTP status while we still can; the
    // authoritative check runs again inside join_user.
    if !state.rooms.room_exists(&params.room_name) {
        log::info!("[WS] Join rejected, room '{}' not found", params.room_name);
        return JamError::RoomNotFound(params.room_name).into_response();
    }
    ws.on_upgrade(move |socket| handle_client(socket, state, params))
}

/// Runs one client connection from join to disconnect.
async fn handle_client(socket: WebSocket, state: AppState, params: JoinRoomQuery) {
    let (mut sink, mut stream) = socket.split();
    let conn = state.rooms.allocate_conn();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let (user, token) =
        match state
            .rooms
            .join_user(&params.room_name, &params.user_name, conn, tx)
        {
            Ok(joined) => joined,
            Err(e) => {
                log::info!(
                    "[WS] Failed to join room '{}' for user '{}': {}",
                    params.room_name,
                    params.user_name,
                    e
                );
                let frame = CloseFrame {
                    code: close_code::POLICY,
                    reason: e.to_string().into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                return;
            }
        };

    log::info!(
        "[WS] User '{}' joined room '{}' as {:?}",
        user.user_name,
        params.room_name,
        user.role
    );

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(payload) => {
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        // Write failed; the read arm will surface the close,
                        // but there is no point waiting for it.
                        break;
                    }
                }
                // Sender dropped: the room was torn down under us.
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state.rooms.relay_chat(&params.room_name, conn, text.to_string());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Ping/pong are answered by axum; binary frames are ignored.
                _ => {}
            },
        }
    }

    if let Err(e) = state.rooms.remove_user(&params.room_name, &token, conn) {
        // Normal when the host's departure already deleted the room.
        log::debug!("[WS] Cleanup for user '{}': {}", user.user_name, e);
    }
    log::info!(
        "[WS] Connection closed for user '{}' in room '{}'",
        user.user_name,
        params.room_name
    );
}
