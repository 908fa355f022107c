//! Room registry and state engine.
//!
//! One process-wide mutex serializes every operation that touches any
//! room: the registry maps, each room's client set, its song queue, and
//! its current song. Contention is bounded by human-paced user actions,
//! and the single lock keeps the host-leave teardown path trivial (a
//! per-room lock would need a second registry lock plus re-entrancy
//! discipline for teardown).
//!
//! Every successful mutation serializes exactly one [`RoomSnapshot`] and
//! enqueues it into the room's bounded fan-out channel before the lock is
//! released. The send never blocks: a full channel drops the snapshot
//! with a warning, because the alternative is deadlocking the whole
//! server behind one slow client. Snapshots for a room reach clients in
//! FIFO order, modulo those drops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::crypto;
use crate::error::{JamError, JamResult};
use crate::events::RoomSnapshot;
use crate::protocol_constants::{BROADCAST_CHANNEL_CAPACITY, CONNECTION_ID_LEN};
use crate::rooms::{ClientConn, ClientTx, ConnId, Role, Room, Song, User};

/// Registry of all live rooms and their fan-out channels.
pub struct RoomRegistry {
    inner: Mutex<RegistryInner>,
    /// Allocator for opaque connection handles.
    next_conn_id: AtomicU64,
}

#[derive(Default)]
struct RegistryInner {
    /// room-name -> room state.
    rooms: HashMap<String, Room>,
    /// room-name -> broadcast channel sender. Keys mirror `rooms` exactly;
    /// dropping a sender closes its channel and stops the broadcaster.
    broadcasts: HashMap<String, mpsc::Sender<String>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Allocates a fresh handle for a transport connection.
    pub fn allocate_conn(&self) -> ConnId {
        ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed))
    }

    /// True if a room with this name is registered.
    pub fn room_exists(&self, room_name: &str) -> bool {
        self.inner.lock().rooms.contains_key(room_name)
    }

    /// Creates a room owned by `host_name` and starts its broadcaster task.
    ///
    /// The room exists before any stream connects: `host_present` stays
    /// false (and guests are rejected) until the host actually joins. No
    /// snapshot is emitted - there is nobody to receive one yet.
    pub fn add_room(self: &Arc<Self>, room_name: &str, host_name: &str) -> JamResult<User> {
        let mut guard = self.inner.lock();
        if guard.rooms.contains_key(room_name) {
            return Err(JamError::RoomExists(room_name.to_string()));
        }

        let room = Room::new(room_name, host_name);
        let host = room.host.clone();
        let (tx, rx) = mpsc::channel(BROADCAST_CHANNEL_CAPACITY);

        guard.rooms.insert(room_name.to_string(), room);
        guard.broadcasts.insert(room_name.to_string(), tx);
        drop(guard);

        tokio::spawn(Self::room_broadcaster(
            Arc::clone(self),
            room_name.to_string(),
            rx,
        ));

        log::info!(
            "[Registry] Room '{}' created by host '{}'",
            room_name,
            host_name
        );
        Ok(host)
    }

    /// Atomically validates and admits a user into a room.
    ///
    /// The declared host may claim the host role once; guests are admitted
    /// only while the host is present. Returns the admitted user and the
    /// encrypted connection-id token the client must quote on every
    /// subsequent action. The join snapshot (carrying that token) is
    /// enqueued before the lock is released.
    pub fn join_user(
        &self,
        room_name: &str,
        user_name: &str,
        conn: ConnId,
        tx: ClientTx,
    ) -> JamResult<(User, String)> {
        let mut guard = self.inner.lock();
        let RegistryInner { rooms, broadcasts } = &mut *guard;
        let room = rooms
            .get_mut(room_name)
            .ok_or_else(|| JamError::RoomNotFound(room_name.to_string()))?;

        if room.has_user_named(user_name) {
            return Err(JamError::DuplicateUser(user_name.to_string()));
        }

        let role = if user_name == room.host.user_name {
            if room.host_present {
                return Err(JamError::HostAlreadyPresent(room_name.to_string()));
            }
            Role::Host
        } else {
            if !room.host_present {
                return Err(JamError::HostNotPresent(room_name.to_string()));
            }
            Role::Guest
        };

        let conn_id_plain = crypto::random_string(CONNECTION_ID_LEN);
        let token = crypto::encrypt(&conn_id_plain, &room.secret)?;

        let user = User {
            user_name: user_name.to_string(),
            role,
            is_alive: true,
        };

        if role == Role::Host {
            room.host_present = true;
        }
        room.clients.insert(
            conn,
            ClientConn {
                user: user.clone(),
                tx,
            },
        );
        room.conn_index.insert(conn_id_plain, conn);
        room.user_list.push(user.clone());

        log::info!(
            "[Registry] User '{}' joined room '{}' as {:?}",
            user_name,
            room_name,
            role
        );
        Self::broadcast_update(broadcasts, room, user.clone(), String::new(), token.clone());
        Ok((user, token))
    }

    /// Removes the connection's user from its room.
    ///
    /// The connection handle is the authoritative key: a token that fails
    /// to decrypt is logged and the handle alone drives the removal. A
    /// departing host tears the whole room down - channel closed, room and
    /// broadcast entries deleted, no farewell snapshot. A departing guest
    /// triggers a normal state broadcast.
    pub fn remove_user(&self, room_name: &str, token: &str, conn: ConnId) -> JamResult<()> {
        let mut guard = self.inner.lock();
        let RegistryInner { rooms, broadcasts } = &mut *guard;

        let user = {
            let room = rooms
                .get_mut(room_name)
                .ok_or_else(|| JamError::RoomNotFound(room_name.to_string()))?;
            let client = room
                .clients
                .remove(&conn)
                .ok_or(JamError::ConnectionNotFound)?;

            match crypto::decrypt(token, &room.secret) {
                Ok(plain) => {
                    room.conn_index.remove(&plain);
                }
                Err(e) => {
                    log::warn!(
                        "[Registry] Could not decrypt connection id for user '{}': {}",
                        client.user.user_name,
                        e
                    );
                    room.conn_index.retain(|_, c| *c != conn);
                }
            }
            room.remove_from_user_list(&client.user);
            client.user
        };

        log::info!(
            "[Registry] User '{}' removed from room '{}'",
            user.user_name,
            room_name
        );

        if user.role == Role::Host {
            log::info!("[Registry] Host left room '{}', deleting room", room_name);
            broadcasts.remove(room_name);
            rooms.remove(room_name);
        } else if let Some(room) = rooms.get(room_name) {
            Self::broadcast_update(broadcasts, room, user, String::new(), token.to_string());
        }
        Ok(())
    }

    /// Adds a song suggestion from the token's owner.
    ///
    /// The first suggestion in an idle room (empty queue, nothing playing)
    /// starts playing immediately; everything else lands in the queue. A
    /// name already queued or currently playing is rejected.
    pub fn suggest_song(&self, song_name: &str, room_name: &str, token: &str) -> JamResult<()> {
        let mut guard = self.inner.lock();
        let RegistryInner { rooms, broadcasts } = &mut *guard;
        let room = rooms
            .get_mut(room_name)
            .ok_or_else(|| JamError::RoomNotFound(room_name.to_string()))?;
        let (_, user) = Self::resolve_actor(room, token)?;

        if let Some(existing) = room
            .queue
            .iter()
            .chain(room.current_song.iter())
            .find(|s| s.song_name == song_name)
        {
            return Err(JamError::DuplicateSuggestion(
                song_name.to_string(),
                existing.suggested_by.user_name.clone(),
            ));
        }

        let ts = room.next_suggestion_timestamp();
        let song = Song::suggested(song_name, user.clone(), ts);

        if room.queue.is_empty() && room.current_song.is_none() {
            log::info!(
                "[Registry] '{}' starts playing immediately in room '{}'",
                song_name,
                room_name
            );
            room.current_song = Some(song);
        } else {
            room.queue.push(song);
            log::info!(
                "[Registry] '{}' queued in room '{}' by '{}'",
                song_name,
                room_name,
                user.user_name
            );
        }

        Self::broadcast_update(broadcasts, room, user, String::new(), token.to_string());
        Ok(())
    }

    /// Records a vote on a queued song from the token's owner.
    ///
    /// Votes apply to queued songs only, never to the one currently
    /// playing. Each user may vote once per song (the suggester's implicit
    /// vote counts).
    pub fn vote_for_song(&self, song_name: &str, room_name: &str, token: &str) -> JamResult<()> {
        let mut guard = self.inner.lock();
        let RegistryInner { rooms, broadcasts } = &mut *guard;
        let room = rooms
            .get_mut(room_name)
            .ok_or_else(|| JamError::RoomNotFound(room_name.to_string()))?;
        let (_, user) = Self::resolve_actor(room, token)?;

        let index = room
            .queue
            .position(song_name)
            .ok_or_else(|| JamError::SongNotFound(song_name.to_string()))?;
        if room
            .queue
            .song_at(index)
            .is_some_and(|s| s.has_vote_from(&user))
        {
            return Err(JamError::DuplicateVote(
                user.user_name.clone(),
                song_name.to_string(),
            ));
        }

        room.queue.add_vote(index, user.clone());
        log::info!(
            "[Registry] User '{}' cast a vote for '{}' in room '{}'",
            user.user_name,
            song_name,
            room_name
        );

        Self::broadcast_update(broadcasts, room, user, String::new(), token.to_string());
        Ok(())
    }

    /// Replaces the current song with the highest-priority queued one.
    ///
    /// Host-only, and the named song must be the one currently playing.
    /// With an empty queue the current song is still discarded and the
    /// room goes idle; the cleared state is broadcast either way. Returns
    /// the name of the song now playing, if any.
    pub fn skip_song(
        &self,
        song_name: &str,
        room_name: &str,
        token: &str,
    ) -> JamResult<Option<String>> {
        let mut guard = self.inner.lock();
        let RegistryInner { rooms, broadcasts } = &mut *guard;
        let room = rooms
            .get_mut(room_name)
            .ok_or_else(|| JamError::RoomNotFound(room_name.to_string()))?;
        let (_, user) = Self::resolve_actor(room, token)?;

        if user.role != Role::Host {
            log::info!(
                "[Registry] Skip rejected for non-host '{}' in room '{}'",
                user.user_name,
                room_name
            );
            return Err(JamError::NotHost);
        }
        match &room.current_song {
            Some(current) if current.song_name == song_name => {}
            _ => return Err(JamError::SongNotPlaying(song_name.to_string())),
        }

        room.current_song = room.queue.pop();
        let next = room.current_song.as_ref().map(|s| s.song_name.clone());
        match &next {
            Some(next_name) => log::info!(
                "[Registry] Skipped '{}' in room '{}', now playing '{}'",
                song_name,
                room_name,
                next_name
            ),
            None => log::info!(
                "[Registry] Skipped '{}' in room '{}', no more songs in the queue",
                song_name,
                room_name
            ),
        }

        Self::broadcast_update(broadcasts, room, user, String::new(), token.to_string());
        Ok(next)
    }

    /// Re-broadcasts an inbound text frame as a chat snapshot.
    ///
    /// Unknown rooms or connections are silently ignored: the reader task
    /// calling this races with teardown by design.
    pub fn relay_chat(&self, room_name: &str, conn: ConnId, message: String) {
        let guard = self.inner.lock();
        let Some(room) = guard.rooms.get(room_name) else {
            return;
        };
        let Some(client) = room.clients.get(&conn) else {
            return;
        };
        Self::broadcast_update(
            &guard.broadcasts,
            room,
            client.user.clone(),
            message,
            String::new(),
        );
    }

    /// Decrypts a connection-id token and resolves the acting user.
    fn resolve_actor(room: &Room, token: &str) -> JamResult<(ConnId, User)> {
        let plain = crypto::decrypt(token, &room.secret)?;
        let conn = room
            .conn_index
            .get(&plain)
            .copied()
            .ok_or(JamError::ConnectionNotFound)?;
        let user = room
            .clients
            .get(&conn)
            .map(|c| c.user.clone())
            .ok_or(JamError::ConnectionNotFound)?;
        Ok((conn, user))
    }

    /// Builds the current snapshot for `room` and enqueues it.
    ///
    /// Must be called with the registry lock held; the send is
    /// non-blocking so the lock is never held across a suspension.
    fn broadcast_update(
        broadcasts: &HashMap<String, mpsc::Sender<String>>,
        room: &Room,
        sender: User,
        message: String,
        connection_id: String,
    ) {
        let snapshot = RoomSnapshot {
            room_name: room.room_name.clone(),
            sender,
            message,
            current_song: room.current_song.clone(),
            current_song_queue: room.queue.snapshot(),
            connected_user_list: room.user_list.clone(),
            connection_id,
        };
        let Some(payload) = snapshot.to_json() else {
            log::error!(
                "[Broadcast] Failed to serialize snapshot for room '{}'",
                room.room_name
            );
            return;
        };
        let Some(tx) = broadcasts.get(&room.room_name) else {
            return;
        };
        match tx.try_send(payload) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => log::warn!(
                "[Broadcast] Channel for room '{}' is full, snapshot dropped",
                room.room_name
            ),
            Err(mpsc::error::TrySendError::Closed(_)) => log::debug!(
                "[Broadcast] Channel for room '{}' already closed",
                room.room_name
            ),
        }
    }

    /// Per-room fan-out task: drains the bounded channel and hands each
    /// snapshot to every connected client's outbound queue.
    ///
    /// The lock is held only long enough to copy the current sender list;
    /// delivery happens after it is released. Per-client failures are
    /// ignored - that client's own read loop observes the disconnect and
    /// runs the removal. Exits when the channel closes (host departure)
    /// or the room disappears out from under it.
    async fn room_broadcaster(
        registry: Arc<Self>,
        room_name: String,
        mut rx: mpsc::Receiver<String>,
    ) {
        log::debug!("[Broadcast] Broadcaster for room '{}' started", room_name);
        while let Some(payload) = rx.recv().await {
            let txs: Vec<ClientTx> = {
                let guard = registry.inner.lock();
                match guard.rooms.get(&room_name) {
                    Some(room) => room.clients.values().map(|c| c.tx.clone()).collect(),
                    // Raced with host teardown.
                    None => break,
                }
            };
            for tx in txs {
                let _ = tx.send(payload.clone());
            }
        }
        log::debug!("[Broadcast] Broadcaster for room '{}' exited", room_name);
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl RoomRegistry {
    /// Invariant check: room names and broadcast channels correspond 1:1.
    fn maps_in_sync(&self) -> bool {
        let guard = self.inner.lock();
        guard.rooms.len() == guard.broadcasts.len()
            && guard.rooms.keys().all(|k| guard.broadcasts.contains_key(k))
    }

    /// Runs `f` against a room's state under the lock.
    fn with_room<T>(&self, room_name: &str, f: impl FnOnce(&Room) -> T) -> Option<T> {
        let guard = self.inner.lock();
        guard.rooms.get(room_name).map(f)
    }
}
