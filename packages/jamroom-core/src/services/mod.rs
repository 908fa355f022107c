//! Application services layer.
//!
//! The single service here is the room registry: the in-memory state
//! engine that every transport-layer request is translated into.

pub mod room_registry;

pub use room_registry::RoomRegistry;
