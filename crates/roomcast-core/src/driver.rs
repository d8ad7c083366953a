//! Relay driver.
//!
//! Owns the [`PresenceRegistry`] and turns transport-level session events
//! into broadcast actions. The runtime feeds one [`SessionEvent`] at a time
//! and executes the returned [`RelayAction`]s before processing the next
//! event; that single-stream discipline is what makes the unsynchronized
//! registry safe.
//!
//! Every handler tolerates a missing registry entry. A message or typing
//! signal from a session that never joined a room, or a disconnect before
//! the first join, produces no actions rather than an error.

use roomcast_proto::{ADMIN, ChatMessage, ClientEvent, ServerEvent, UserEntry};

use crate::{
    clock::Clock,
    presence::{PresenceRegistry, SessionId},
};

/// Transport-level events the driver processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new connection was accepted.
    Connected {
        /// Session id assigned by the transport.
        session_id: SessionId,
    },

    /// A decoded event arrived from a connection.
    Inbound {
        /// Session that sent the event.
        session_id: SessionId,
        /// The decoded event.
        event: ClientEvent,
    },

    /// A connection was closed, by the peer or by error.
    Disconnected {
        /// Session that went away.
        session_id: SessionId,
    },
}

/// Outbound deliveries for the runtime to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// Deliver to one session only.
    SendToSession {
        /// Target session.
        session_id: SessionId,
        /// Event to deliver.
        event: ServerEvent,
    },

    /// Deliver to every member of a room.
    ///
    /// Membership is resolved against the registry at execution time, after
    /// the whole triggering event has been processed. A session that moved
    /// rooms during that event is therefore addressed by its new room only.
    BroadcastToRoom {
        /// Target room.
        room: String,
        /// Event to deliver.
        event: ServerEvent,
        /// Session to skip, for sender-exclusive notices.
        exclude_session: Option<SessionId>,
    },

    /// Deliver to every connected session regardless of room.
    BroadcastAll {
        /// Event to deliver.
        event: ServerEvent,
    },
}

/// Presence and broadcast engine.
///
/// Generic over [`Clock`] so message timestamps are deterministic in tests.
#[derive(Debug)]
pub struct RelayDriver<C: Clock> {
    /// Authoritative table of joined users.
    registry: PresenceRegistry,
    /// Timestamp source for chat messages.
    clock: C,
}

impl<C: Clock> RelayDriver<C> {
    /// Create a driver with an empty registry.
    pub fn new(clock: C) -> Self {
        Self { registry: PresenceRegistry::new(), clock }
    }

    /// Process one session event and return the deliveries it causes.
    ///
    /// This is the only entry point that mutates the registry.
    pub fn process_event(&mut self, event: SessionEvent) -> Vec<RelayAction> {
        match event {
            SessionEvent::Connected { session_id } => self.handle_connected(session_id),
            SessionEvent::Inbound { session_id, event } => match event {
                ClientEvent::EnterRoom { name, room } => {
                    self.handle_enter_room(session_id, name, room)
                },
                ClientEvent::Message { name, text } => self.handle_message(session_id, name, text),
                ClientEvent::Activity(name) => self.handle_activity(session_id, name),
            },
            SessionEvent::Disconnected { session_id } => self.handle_disconnected(session_id),
        }
    }

    /// Welcome the new connection. No registry change until it joins a room.
    fn handle_connected(&self, session_id: SessionId) -> Vec<RelayAction> {
        vec![RelayAction::SendToSession {
            session_id,
            event: self.system_message("Welcome to Chat App".to_string()),
        }]
    }

    /// Join a room, leaving the current one first if it differs.
    fn handle_enter_room(
        &mut self,
        session_id: SessionId,
        name: String,
        room: String,
    ) -> Vec<RelayAction> {
        let mut actions = Vec::new();

        // Re-entering the current room is not a departure.
        let previous_room = self
            .registry
            .lookup(session_id)
            .map(|user| user.room.clone())
            .filter(|previous| previous != &room);

        if let Some(previous) = &previous_room {
            actions.push(RelayAction::BroadcastToRoom {
                room: previous.clone(),
                event: self.system_message(format!("{name} has left the room")),
                exclude_session: None,
            });
        }

        let user = self.registry.activate(session_id, name, room);

        // The previous room's member list must be snapshotted only after
        // activation, or the departing user would still be counted.
        if let Some(previous) = &previous_room {
            actions.push(RelayAction::BroadcastToRoom {
                room: previous.clone(),
                event: self.user_list(previous),
                exclude_session: None,
            });
        }

        actions.push(RelayAction::SendToSession {
            session_id,
            event: self.system_message(format!("You have joined the {} chat room", user.room)),
        });

        actions.push(RelayAction::BroadcastToRoom {
            room: user.room.clone(),
            event: self.system_message(format!("{} has joined the room", user.name)),
            exclude_session: Some(session_id),
        });

        actions.push(RelayAction::BroadcastToRoom {
            room: user.room.clone(),
            event: self.user_list(&user.room),
            exclude_session: None,
        });

        actions.push(RelayAction::BroadcastAll { event: self.room_list() });

        actions
    }

    /// Relay a chat message to the sender's room, sender included.
    ///
    /// A message from a session that never joined a room is dropped.
    fn handle_message(&self, session_id: SessionId, name: String, text: String) -> Vec<RelayAction> {
        let Some(room) = self.registry.lookup(session_id).map(|user| user.room.clone()) else {
            return Vec::new();
        };

        vec![RelayAction::BroadcastToRoom {
            room,
            event: ServerEvent::Message(ChatMessage { name, text, time: self.timestamp() }),
            exclude_session: None,
        }]
    }

    /// Notify the sender's room that `name` is typing, sender excluded.
    fn handle_activity(&self, session_id: SessionId, name: String) -> Vec<RelayAction> {
        let Some(room) = self.registry.lookup(session_id).map(|user| user.room.clone()) else {
            return Vec::new();
        };

        vec![RelayAction::BroadcastToRoom {
            room,
            event: ServerEvent::Activity { name },
            exclude_session: Some(session_id),
        }]
    }

    /// Tear down the session's presence and notify its room, if it had one.
    ///
    /// The entry must be captured before removal; removal erases the room
    /// name needed to address the notices.
    fn handle_disconnected(&mut self, session_id: SessionId) -> Vec<RelayAction> {
        let user = self.registry.lookup(session_id).cloned();
        self.registry.remove(session_id);

        let Some(user) = user else {
            // Disconnect before the first join: nobody to notify.
            return Vec::new();
        };

        vec![
            RelayAction::BroadcastToRoom {
                room: user.room.clone(),
                event: self.system_message(format!("{} left the room", user.name)),
                exclude_session: None,
            },
            RelayAction::BroadcastToRoom {
                room: user.room.clone(),
                event: self.user_list(&user.room),
                exclude_session: None,
            },
            RelayAction::BroadcastAll { event: self.room_list() },
        ]
    }

    /// Session ids of every member of `room`, for action execution.
    pub fn sessions_in_room(&self, room: &str) -> impl Iterator<Item = SessionId> + '_ {
        self.registry.sessions_in(room)
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// A system-authored chat message, timestamped now.
    fn system_message(&self, text: String) -> ServerEvent {
        ServerEvent::Message(ChatMessage { name: ADMIN.to_string(), text, time: self.timestamp() })
    }

    /// Membership snapshot for `room` as currently recorded.
    fn user_list(&self, room: &str) -> ServerEvent {
        ServerEvent::UserList {
            users: self.registry.members_of(room).into_iter().map(UserEntry::from).collect(),
        }
    }

    /// Snapshot of every active room name.
    fn room_list(&self) -> ServerEvent {
        ServerEvent::RoomList { rooms: self.registry.active_rooms() }
    }

    /// Time of day at dispatch, human-readable.
    fn timestamp(&self) -> String {
        self.clock.now().format("%H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, TimeZone};

    use super::*;

    #[derive(Clone)]
    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn driver() -> RelayDriver<FixedClock> {
        let noon = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        RelayDriver::new(FixedClock(noon))
    }

    fn enter(name: &str, room: &str) -> ClientEvent {
        ClientEvent::EnterRoom { name: name.to_string(), room: room.to_string() }
    }

    #[test]
    fn connect_sends_welcome_unicast_only() {
        let mut driver = driver();

        let actions = driver.process_event(SessionEvent::Connected { session_id: 1 });

        assert_eq!(actions, vec![RelayAction::SendToSession {
            session_id: 1,
            event: ServerEvent::Message(ChatMessage {
                name: ADMIN.to_string(),
                text: "Welcome to Chat App".to_string(),
                time: "12:30:15".to_string(),
            }),
        }]);
        assert!(driver.registry().is_empty());
    }

    #[test]
    fn message_from_unjoined_session_is_dropped() {
        let mut driver = driver();

        driver.process_event(SessionEvent::Connected { session_id: 1 });
        let actions = driver.process_event(SessionEvent::Inbound {
            session_id: 1,
            event: ClientEvent::Message { name: "Alice".to_string(), text: "hi".to_string() },
        });

        assert!(actions.is_empty());
    }

    #[test]
    fn activity_excludes_sender_and_targets_room() {
        let mut driver = driver();

        driver.process_event(SessionEvent::Inbound { session_id: 1, event: enter("Alice", "den") });
        let actions = driver.process_event(SessionEvent::Inbound {
            session_id: 1,
            event: ClientEvent::Activity("Alice".to_string()),
        });

        assert_eq!(actions, vec![RelayAction::BroadcastToRoom {
            room: "den".to_string(),
            event: ServerEvent::Activity { name: "Alice".to_string() },
            exclude_session: Some(1),
        }]);
    }

    #[test]
    fn activity_from_unjoined_session_is_dropped() {
        let mut driver = driver();

        let actions = driver.process_event(SessionEvent::Inbound {
            session_id: 1,
            event: ClientEvent::Activity("Alice".to_string()),
        });

        assert!(actions.is_empty());
    }

    #[test]
    fn disconnect_before_join_produces_no_broadcasts() {
        let mut driver = driver();

        driver.process_event(SessionEvent::Connected { session_id: 1 });
        let actions = driver.process_event(SessionEvent::Disconnected { session_id: 1 });

        assert!(actions.is_empty());
    }

    #[test]
    fn rejoining_same_room_emits_no_departure() {
        let mut driver = driver();

        driver.process_event(SessionEvent::Inbound { session_id: 1, event: enter("Alice", "den") });
        let actions = driver
            .process_event(SessionEvent::Inbound { session_id: 1, event: enter("Alice", "den") });

        // No "has left the room" notice and no previous-room member list.
        let departures = actions
            .iter()
            .filter(|action| {
                matches!(action, RelayAction::BroadcastToRoom {
                    event: ServerEvent::Message(message),
                    ..
                } if message.text.contains("left"))
            })
            .count();
        assert_eq!(departures, 0);
        assert_eq!(driver.registry().len(), 1);
    }
}
