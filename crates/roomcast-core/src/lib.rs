//! Presence and room-broadcast engine for the roomcast chat relay.
//!
//! This crate is pure logic with no I/O. The [`RelayDriver`] consumes
//! transport-level [`SessionEvent`]s and returns [`RelayAction`]s for a
//! runtime to execute - the runtime owns sockets, the driver owns state.
//! This split keeps every membership and fan-out rule testable without a
//! network.
//!
//! # Components
//!
//! - [`PresenceRegistry`]: who is connected, under what name, in which room
//! - [`RelayDriver`]: join/leave/disconnect transitions and broadcast fan-out
//! - [`Clock`]: wall-clock abstraction so message timestamps are
//!   deterministic in tests

#![forbid(unsafe_code)]

mod clock;
mod driver;
mod presence;

pub use clock::Clock;
pub use driver::{RelayAction, RelayDriver, SessionEvent};
pub use presence::{PresenceRegistry, SessionId, User};
