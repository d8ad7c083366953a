//! Inbound and outbound event payloads.
//!
//! The variant tag is the wire-level event name (`enterRoom`, `message`,
//! `activity`, `userList`, `roomList`), so adding a variant here is the only
//! step needed to add an event type.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Sender name used for system-authored lifecycle notices
/// (welcome, join, leave).
pub const ADMIN: &str = "Admin";

/// Events a client may send.
///
/// Connect and disconnect are transport-level signals and carry no envelope;
/// they never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join a room, leaving the current one if any.
    #[serde(rename_all = "camelCase")]
    EnterRoom {
        /// Display name chosen by the client. Not validated, not unique.
        name: String,
        /// Room to join.
        room: String,
    },

    /// Send a chat message to the sender's current room.
    #[serde(rename_all = "camelCase")]
    Message {
        /// Display name of the sender.
        name: String,
        /// Message body.
        text: String,
    },

    /// Typing-activity signal. The payload is the bare display name.
    Activity(String),
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A chat message, system- or user-authored.
    Message(ChatMessage),

    /// Membership snapshot for one room.
    #[serde(rename_all = "camelCase")]
    UserList {
        /// Current members of the room.
        users: Vec<UserEntry>,
    },

    /// Names of every room that currently has members.
    #[serde(rename_all = "camelCase")]
    RoomList {
        /// Active room names.
        rooms: Vec<String>,
    },

    /// Someone in the recipient's room is typing.
    #[serde(rename_all = "camelCase")]
    Activity {
        /// Display name of the typist.
        name: String,
    },
}

/// A delivered chat message.
///
/// `time` is stamped when the server dispatches the message, not when the
/// client submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the sender ([`ADMIN`] for system notices).
    pub name: String,
    /// Message body.
    pub text: String,
    /// Human-readable time of day at dispatch.
    pub time: String,
}

/// One member in a [`ServerEvent::UserList`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Session id assigned by the transport.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Room the member is in.
    pub room: String,
}

/// Decode an inbound text frame into a [`ClientEvent`].
pub fn decode(text: &str) -> Result<ClientEvent, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode an outbound event as a JSON text frame.
pub fn encode(event: &ServerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_enter_room() {
        let event = decode(r#"{"event":"enterRoom","data":{"name":"Alice","room":"lobby"}}"#)
            .unwrap();
        assert_eq!(
            event,
            ClientEvent::EnterRoom { name: "Alice".to_string(), room: "lobby".to_string() }
        );
    }

    #[test]
    fn decode_activity_carries_bare_name() {
        let event = decode(r#"{"event":"activity","data":"Alice"}"#).unwrap();
        assert_eq!(event, ClientEvent::Activity("Alice".to_string()));
    }

    #[test]
    fn decode_rejects_unknown_event() {
        assert!(decode(r#"{"event":"shutdown","data":{}}"#).is_err());
    }

    #[test]
    fn decode_rejects_mismatched_payload() {
        // enterRoom tag with a message-shaped payload
        assert!(decode(r#"{"event":"enterRoom","data":{"name":"A","text":"hi"}}"#).is_err());
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(decode("not json").is_err());
    }

    #[test]
    fn encode_message_uses_wire_envelope() {
        let event = ServerEvent::Message(ChatMessage {
            name: ADMIN.to_string(),
            text: "Welcome to Chat App".to_string(),
            time: "12:30:15".to_string(),
        });
        let json: serde_json::Value =
            serde_json::from_str(&encode(&event).unwrap()).unwrap();
        assert_eq!(json["event"], "message");
        assert_eq!(json["data"]["name"], "Admin");
        assert_eq!(json["data"]["time"], "12:30:15");
    }

    #[test]
    fn encode_room_list() {
        let event = ServerEvent::RoomList { rooms: vec!["den".to_string(), "lobby".to_string()] };
        let json: serde_json::Value =
            serde_json::from_str(&encode(&event).unwrap()).unwrap();
        assert_eq!(json["event"], "roomList");
        assert_eq!(json["data"]["rooms"][1], "lobby");
    }
}
