//! Presence registry: the authoritative table of joined users.
//!
//! Keyed by session id with at most one entry per id, so a connection is in
//! at most one room. Rooms are never stored - a room is the set of users
//! whose `room` field names it, and it ceases to exist when its last member
//! leaves. Deriving membership on demand means there is no second
//! room-collection invariant to keep in sync.
//!
//! Every operation tolerates a missing entry. A disconnect before the first
//! join, or a message from an unjoined session, is a no-op by design.

use std::collections::{BTreeSet, HashMap};

use roomcast_proto::UserEntry;

/// Transport-assigned identifier for one live connection.
pub type SessionId = u64;

/// One actively-connected, room-joined participant.
///
/// No entry exists before a session's first `enterRoom`; there is no
/// user-without-room state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Session id, unique per live connection.
    pub id: SessionId,
    /// Display name supplied at join time. Not validated, not unique.
    pub name: String,
    /// Room currently joined.
    pub room: String,
}

impl From<&User> for UserEntry {
    fn from(user: &User) -> Self {
        Self { id: user.id, name: user.name.clone(), room: user.room.clone() }
    }
}

/// In-memory table of joined users, indexed by session id.
///
/// Owned and mutated only by the relay driver; membership and room-list
/// queries are derived read-only views over it.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    /// Session id → user. At most one entry per id.
    users: HashMap<SessionId, User>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for a session.
    ///
    /// Always succeeds; a prior entry for the same session (a re-join) is
    /// overwritten. Returns the resulting user.
    pub fn activate(&mut self, id: SessionId, name: String, room: String) -> User {
        let user = User { id, name, room };
        self.users.insert(id, user.clone());
        user
    }

    /// Delete the entry for a session. Idempotent.
    pub fn remove(&mut self, id: SessionId) {
        self.users.remove(&id);
    }

    /// Current entry for a session, if it has joined a room.
    pub fn lookup(&self, id: SessionId) -> Option<&User> {
        self.users.get(&id)
    }

    /// All users whose current room is `room`. Order-insensitive.
    pub fn members_of(&self, room: &str) -> Vec<&User> {
        self.users.values().filter(|user| user.room == room).collect()
    }

    /// Session ids of every member of `room`.
    pub fn sessions_in(&self, room: &str) -> impl Iterator<Item = SessionId> + '_ {
        let room = room.to_string();
        self.users.values().filter(move |user| user.room == room).map(|user| user.id)
    }

    /// Distinct names of rooms with at least one member, sorted.
    pub fn active_rooms(&self) -> Vec<String> {
        let rooms: BTreeSet<&str> = self.users.values().map(|user| user.room.as_str()).collect();
        rooms.into_iter().map(str::to_string).collect()
    }

    /// Number of joined users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no user has joined a room.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
