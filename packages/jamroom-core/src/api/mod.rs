//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that translate transport-layer
//! inputs into registry calls. It provides the router construction and
//! server startup functionality.

use std::sync::Arc;

use thiserror::Error;

use crate::auth::AuthService;
use crate::kv::Pinger;
use crate::services::RoomRegistry;

pub mod http;
pub mod response;
pub mod ws;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve on the TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services. All business
/// logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// All live rooms and their fan-out channels.
    pub rooms: Arc<RoomRegistry>,
    /// Login sessions gating room creation.
    pub auth: Arc<AuthService>,
    /// Key-value backend probed by the health endpoint.
    pub kv: Arc<dyn Pinger>,
}

impl AppState {
    /// Assembles the application state from its services.
    pub fn new(rooms: Arc<RoomRegistry>, auth: Arc<AuthService>, kv: Arc<dyn Pinger>) -> Self {
        Self { rooms, auth, kv }
    }
}

/// Starts the HTTP server on `port`, serving until the process exits.
pub async fn start_server(state: AppState, port: u16) -> Result<(), ServerError> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Server listening on http://0.0.0.0:{}", port);

    let app = http::create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
