//! Broadcast records pushed to connected clients.
//!
//! A [`RoomSnapshot`] is the authoritative, self-contained view of a
//! room's mutable state. The registry serializes exactly one per
//! successful mutation and enqueues it into the room's bounded fan-out
//! channel; the broadcaster task delivers it to every connected client as
//! a single text frame.

use serde::Serialize;

use crate::rooms::{Song, User};

/// One authoritative room-state update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_name: String,
    /// The user whose action produced this snapshot.
    pub sender: User,
    /// Free-text chat payload when relaying an inbound frame, else empty.
    pub message: String,
    pub current_song: Option<Song>,
    /// Queue contents in internal heap order; clients re-sort if they
    /// want display order.
    pub current_song_queue: Vec<Song>,
    /// Connected users in join order.
    pub connected_user_list: Vec<User>,
    /// Encrypted connection-id of the actor, echoed back so the actor can
    /// correlate. Empty for chat relays and background events.
    pub connection_id: String,
}

impl RoomSnapshot {
    /// Serializes to the JSON text frame sent over the wire.
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_wire_field_names() {
        let snapshot = RoomSnapshot {
            room_name: "den".into(),
            sender: User::host("alice"),
            message: String::new(),
            current_song: Some(Song::suggested("track", User::host("alice"), 7)),
            current_song_queue: vec![],
            connected_user_list: vec![User::host("alice")],
            connection_id: "token".into(),
        };

        let json: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["roomName"], "den");
        assert_eq!(json["sender"]["userName"], "alice");
        assert_eq!(json["sender"]["role"], "host");
        assert_eq!(json["message"], "");
        assert_eq!(json["currentSong"]["songName"], "track");
        assert_eq!(json["currentSongQueue"], serde_json::json!([]));
        assert_eq!(json["connectedUserList"][0]["userName"], "alice");
        assert_eq!(json["connectionId"], "token");
    }

    #[test]
    fn idle_room_serializes_null_current_song() {
        let snapshot = RoomSnapshot {
            room_name: "den".into(),
            sender: User::host("alice"),
            message: String::new(),
            current_song: None,
            current_song_queue: vec![],
            connected_user_list: vec![],
            connection_id: String::new(),
        };

        let json: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert!(json["currentSong"].is_null());
    }
}
