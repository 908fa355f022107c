//! Jamroom Core - shared library for the Jamroom collaborative music queue.
//!
//! Each room is an isolated session: one host, any number of guests, a
//! priority-ordered queue of suggested songs, and a currently playing
//! song. Every participant holds a persistent WebSocket; after each state
//! change the server fans an authoritative room snapshot out to all of
//! them.
//!
//! # Architecture
//!
//! - [`rooms`]: the data model (users, songs, per-room state) and the
//!   indexed max-heap song queue
//! - [`services`]: the room registry - the single-mutex state engine all
//!   requests funnel into, plus the per-room broadcaster tasks
//! - [`crypto`]: AES-CFB connection-id capabilities and random secrets
//! - [`events`]: the broadcast snapshot record
//! - [`api`]: axum router, CORS, WebSocket handling, server startup
//! - [`auth`]: login sessions gating room creation
//! - [`kv`]: key-value backend trait probed by the health endpoint
//! - [`error`]: centralized error types
//!
//! State is purely in-memory: a room lives in exactly one process and
//! does not survive a restart.

#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod crypto;
pub mod error;
pub mod events;
pub mod kv;
pub mod protocol_constants;
pub mod rooms;
pub mod services;
pub mod utils;

// Re-export commonly used types at the crate root
pub use api::{start_server, AppState, ServerError};
pub use auth::{AuthService, Credentials, Session};
pub use crypto::CryptoError;
pub use error::{JamError, JamResult};
pub use events::RoomSnapshot;
pub use kv::{NoopPinger, Pinger};
pub use rooms::{ConnId, Role, Room, Song, User};
pub use services::RoomRegistry;
pub use utils::now_millis;
