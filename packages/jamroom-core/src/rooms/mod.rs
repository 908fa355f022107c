//! Room data model: users, songs, and per-room state.
//!
//! Everything here is plain owned data. All mutation goes through the
//! registry (`services::room_registry`), which serializes access with a
//! single process-wide mutex; nothing in this module locks.

pub mod queue;

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::crypto;
use crate::protocol_constants::ROOM_SECRET_LEN;
use crate::rooms::queue::SongQueue;
use crate::utils::now_millis;

/// Role of a user within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single privileged user; the only one allowed to skip songs,
    /// and the one whose disconnect destroys the room.
    Host,
    Guest,
}

/// Identity of a participant within a room.
///
/// Songs keep owned copies of their voters rather than references into the
/// live client set, so a vote record stays comparable after its user
/// disconnects. Vote identity is full-value equality: name, role, liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_name: String,
    pub role: Role,
    pub is_alive: bool,
}

impl User {
    /// A live user with the host role.
    pub fn host(name: impl Into<String>) -> Self {
        Self {
            user_name: name.into(),
            role: Role::Host,
            is_alive: true,
        }
    }

    /// A live user with the guest role.
    pub fn guest(name: impl Into<String>) -> Self {
        Self {
            user_name: name.into(),
            role: Role::Guest,
            is_alive: true,
        }
    }
}

/// Opaque handle for one live connection.
///
/// Allocated by the registry; the engine never sees sockets, only handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnId(pub u64);

/// Outbound snapshot queue for one client.
///
/// The client's WebSocket write loop drains this and forwards each payload
/// as a text frame. Unbounded so the broadcaster's sends never block.
pub type ClientTx = mpsc::UnboundedSender<String>;

/// A suggested track.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub song_name: String,
    /// Voters in vote order; the first entry is always the suggester.
    pub votes: Vec<User>,
    /// Cached `votes.len()`.
    pub vote_count: usize,
    pub suggested_by: User,
    /// Wall-clock milliseconds, strictly increasing within a room.
    #[serde(rename = "suggestedTimeStamp")]
    pub suggested_at_ms: u64,
    /// Position in the owning queue; maintained by [`SongQueue`].
    #[serde(skip)]
    pub(crate) heap_index: usize,
}

impl Song {
    /// Creates a song with the suggester as its first (and only) vote.
    pub fn suggested(name: impl Into<String>, by: User, at_ms: u64) -> Self {
        Self {
            song_name: name.into(),
            votes: vec![by.clone()],
            vote_count: 1,
            suggested_by: by,
            suggested_at_ms: at_ms,
            heap_index: 0,
        }
    }

    /// True if `user` already appears in this song's vote list.
    #[must_use]
    pub fn has_vote_from(&self, user: &User) -> bool {
        self.votes.iter().any(|v| v == user)
    }
}

/// A connected client: the user plus its outbound snapshot queue.
#[derive(Debug, Clone)]
pub struct ClientConn {
    pub user: User,
    pub tx: ClientTx,
}

/// Mutable state of one room.
///
/// All access is serialized by the registry mutex. `clients` and
/// `conn_index` stay in 1:1 correspondence via the connection handle.
#[derive(Debug)]
pub struct Room {
    pub room_name: String,
    /// The identity declared at creation; fixed for the room's lifetime,
    /// independent of whether that user is currently connected.
    pub host: User,
    /// Whether the host is currently connected. Guests are rejected until
    /// this flips to true.
    pub host_present: bool,
    /// Live connections keyed by connection handle.
    pub clients: HashMap<ConnId, ClientConn>,
    /// Plaintext connection-id -> connection handle.
    pub conn_index: HashMap<String, ConnId>,
    /// Connected users in join order.
    pub user_list: Vec<User>,
    /// Suggested songs, excluding the one currently playing.
    pub queue: SongQueue,
    pub current_song: Option<Song>,
    /// AES key for connection-id tokens; dies with the room.
    pub secret: String,
    /// High-water mark keeping suggestion timestamps strictly increasing.
    last_suggested_ms: u64,
}

impl Room {
    /// Creates an empty room owned by `host_name` with a fresh secret.
    pub fn new(room_name: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            host: User::host(host_name),
            host_present: false,
            clients: HashMap::new(),
            conn_index: HashMap::new(),
            user_list: Vec::new(),
            queue: SongQueue::new(),
            current_song: None,
            secret: crypto::random_string(ROOM_SECRET_LEN),
            last_suggested_ms: 0,
        }
    }

    /// Next suggestion timestamp: wall clock, bumped past the previous one
    /// so ordering stays strict even within a single millisecond.
    pub fn next_suggestion_timestamp(&mut self) -> u64 {
        let ts = now_millis().max(self.last_suggested_ms + 1);
        self.last_suggested_ms = ts;
        ts
    }

    /// True if a connected client already uses `name`.
    #[must_use]
    pub fn has_user_named(&self, name: &str) -> bool {
        self.clients.values().any(|c| c.user.user_name == name)
    }

    /// Removes the first matching user from the join-order list.
    pub fn remove_from_user_list(&mut self, user: &User) {
        if let Some(pos) = self.user_list.iter().position(|u| u == user) {
            self.user_list.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_identity_is_full_value_equality() {
        let alive_guest = User::guest("sam");
        let mut dead_guest = User::guest("sam");
        dead_guest.is_alive = false;
        let host = User::host("sam");

        assert_eq!(alive_guest, User::guest("sam"));
        assert_ne!(alive_guest, dead_guest);
        assert_ne!(alive_guest, host);
    }

    #[test]
    fn suggested_song_carries_suggester_as_first_vote() {
        let song = Song::suggested("track", User::guest("sam"), 42);
        assert_eq!(song.vote_count, 1);
        assert_eq!(song.votes[0], song.suggested_by);
        assert_eq!(song.suggested_at_ms, 42);
    }

    #[test]
    fn new_room_starts_idle_without_host() {
        let room = Room::new("den", "alice");
        assert_eq!(room.host.role, Role::Host);
        assert!(!room.host_present);
        assert!(room.clients.is_empty());
        assert!(room.queue.is_empty());
        assert!(room.current_song.is_none());
        assert_eq!(room.secret.len(), ROOM_SECRET_LEN);
    }

    #[test]
    fn suggestion_timestamps_strictly_increase() {
        let mut room = Room::new("den", "alice");
        let mut prev = 0;
        for _ in 0..50 {
            let ts = room.next_suggestion_timestamp();
            assert!(ts > prev, "timestamp {} not past previous {}", ts, prev);
            prev = ts;
        }
    }

    #[test]
    fn user_list_removal_matches_by_value() {
        let mut room = Room::new("den", "alice");
        room.user_list.push(User::host("alice"));
        room.user_list.push(User::guest("bob"));
        room.user_list.push(User::guest("carol"));

        room.remove_from_user_list(&User::guest("bob"));
        let names: Vec<&str> = room.user_list.iter().map(|u| u.user_name.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);

        // A same-named user with a different role does not match.
        room.remove_from_user_list(&User::guest("alice"));
        assert_eq!(room.user_list.len(), 2);
    }

    #[test]
    fn song_serializes_with_wire_field_names() {
        let song = Song::suggested("track", User::guest("sam"), 42);
        let json = serde_json::to_value(&song).unwrap();

        assert_eq!(json["songName"], "track");
        assert_eq!(json["voteCount"], 1);
        assert_eq!(json["suggestedTimeStamp"], 42);
        assert_eq!(json["suggestedBy"]["userName"], "sam");
        assert_eq!(json["suggestedBy"]["role"], "guest");
        assert_eq!(json["votes"][0]["isAlive"], true);
        assert!(json.get("heapIndex").is_none(), "heap position is internal");
    }
}
