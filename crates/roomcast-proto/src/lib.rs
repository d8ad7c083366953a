//! Wire events for the roomcast chat relay.
//!
//! Events travel as JSON text frames shaped like
//! `{"event": <name>, "data": <payload>}`. The envelope keeps routing cheap:
//! the `event` tag selects the variant, the `data` field carries the payload.
//!
//! Inbound and outbound traffic use separate enums. A client can never send a
//! `userList` and the server never re-parses its own output, so sharing one
//! enum would only widen the attack surface of [`decode`].

#![forbid(unsafe_code)]

mod errors;
mod events;

pub use errors::ProtocolError;
pub use events::{ADMIN, ChatMessage, ClientEvent, ServerEvent, UserEntry, decode, encode};
