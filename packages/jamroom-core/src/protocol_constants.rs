//! Fixed engine-contract constants that should NOT be changed.
//!
//! These values are part of the room engine's externally observable
//! behavior (token shapes, fan-out capacity) and changing them would break
//! compatibility with deployed clients.

/// Capacity of each room's broadcast fan-out channel.
///
/// The enqueuer holds the registry lock, so sends into this channel must
/// never block; a snapshot arriving at a full channel is dropped with a
/// warning instead.
pub const BROADCAST_CHANNEL_CAPACITY: usize = 16;

/// Length of the per-room secret string, in bytes.
///
/// 32 bytes selects AES-256 for connection-id token encryption.
pub const ROOM_SECRET_LEN: usize = 32;

/// Length of the plaintext connection-id generated per join.
pub const CONNECTION_ID_LEN: usize = 32;

/// Length of bearer tokens issued by the login endpoint.
pub const AUTH_TOKEN_LEN: usize = 32;
