//! Roomcast production server.
//!
//! Production runtime wrapping [`roomcast_core`]'s action-based relay logic
//! with real I/O: a Tokio TCP listener, WebSocket framing via
//! tokio-tungstenite, and the system clock.
//!
//! # Architecture
//!
//! The [`RelayDriver`] is pure logic - it consumes session events and
//! returns delivery actions. This crate executes those actions: each
//! session gets an unbounded outbound channel drained by a writer task, so
//! deliveries to one client stay ordered. The driver is behind a single
//! mutex and each inbound event is processed and executed before the lock
//! is released, preserving the one-event-at-a-time discipline the registry
//! relies on.
//!
//! Cross-origin policy is enforced during the HTTP upgrade: with a
//! non-empty allow-list, a request whose `Origin` header is absent or not
//! listed is refused with 403 before the socket ever reaches the relay.

#![forbid(unsafe_code)]

mod error;
mod system_clock;

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

pub use error::ServerError;
use futures_util::{SinkExt, StreamExt};
use roomcast_core::{RelayAction, RelayDriver, SessionEvent, SessionId};
use roomcast_proto::ServerEvent;
pub use system_clock::SystemClock;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, RwLock, mpsc},
};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
        http::StatusCode,
    },
};

/// Outbound channel for one session's writer task.
type PeerSender = mpsc::UnboundedSender<Message>;

/// Shared state for all connections: session id → outbound channel.
struct SharedState {
    /// Registered peers. A session appears here from handshake to teardown.
    peers: RwLock<HashMap<SessionId, PeerSender>>,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g. "0.0.0.0:3500").
    pub bind_address: String,
    /// Origins accepted during the WebSocket upgrade. Empty accepts any.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:3500".to_string(), allowed_origins: Vec::new() }
    }
}

/// Production roomcast server.
///
/// Wraps the [`RelayDriver`] with a TCP listener and WebSocket transport.
pub struct Server {
    /// The relay driver, handed to `run`.
    driver: RelayDriver<SystemClock>,
    /// Bound TCP listener.
    listener: TcpListener,
    /// Origin allow-list from the config.
    allowed_origins: Arc<Vec<String>>,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        let driver = RelayDriver::new(SystemClock::new());

        Ok(Self { driver, listener, allowed_origins: Arc::new(config.allowed_origins) })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and relaying events.
    ///
    /// Runs until the process is shut down. Accept errors are logged and
    /// the listener keeps going.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("server listening on {}", self.listener.local_addr()?);

        let driver = Arc::new(Mutex::new(self.driver));
        let shared = Arc::new(SharedState { peers: RwLock::new(HashMap::new()) });

        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let allowed_origins = Arc::clone(&self.allowed_origins);

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, peer_addr, driver, shared, allowed_origins)
                                .await
                        {
                            tracing::debug!("connection error from {}: {}", peer_addr, e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("accept error: {}", e);
                },
            }
        }
    }
}

/// Generate a random session id.
#[allow(clippy::expect_used)]
fn random_session_id() -> SessionId {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf)
        .expect("invariant: OS RNG failure is unrecoverable for session id assignment");
    u64::from_le_bytes(buf)
}

/// Reject the upgrade when the request's origin is not allowed.
fn check_origin(request: &Request, allowed: &[String]) -> Result<(), ErrorResponse> {
    if allowed.is_empty() {
        return Ok(());
    }

    let origin = request
        .headers()
        .get("origin")
        .and_then(|value| value.to_str().ok());

    if origin.is_some_and(|origin| allowed.iter().any(|allowed| allowed == origin)) {
        return Ok(());
    }

    tracing::warn!("rejected upgrade from origin {:?}", origin);
    let mut response = ErrorResponse::new(Some("origin not allowed".to_string()));
    *response.status_mut() = StatusCode::FORBIDDEN;
    Err(response)
}

/// Handle one WebSocket connection from handshake to teardown.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    driver: Arc<Mutex<RelayDriver<SystemClock>>>,
    shared: Arc<SharedState>,
    allowed_origins: Arc<Vec<String>>,
) -> Result<(), ServerError> {
    let ws = accept_hdr_async(stream, |request: &Request, response: Response| {
        check_origin(request, &allowed_origins).map(|()| response)
    })
    .await?;

    let session_id = random_session_id();
    tracing::info!("session {} connected from {}", session_id, peer_addr);

    let (mut sink, mut inbound) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // One writer task per session keeps its deliveries ordered.
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    // Register before dispatching Connected so the welcome finds the peer.
    {
        let mut peers = shared.peers.write().await;
        peers.insert(session_id, tx);
    }

    dispatch(&driver, &shared, SessionEvent::Connected { session_id }).await;

    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Text(text)) => match roomcast_proto::decode(&text) {
                Ok(event) => {
                    dispatch(&driver, &shared, SessionEvent::Inbound { session_id, event }).await;
                },
                Err(e) => {
                    tracing::warn!("session {} sent a malformed event: {}", session_id, e);
                },
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // Binary, ping and pong frames carry no chat events.
            },
            Err(e) => {
                tracing::debug!("session {} read error: {}", session_id, e);
                break;
            },
        }
    }

    {
        let mut peers = shared.peers.write().await;
        peers.remove(&session_id);
    }

    dispatch(&driver, &shared, SessionEvent::Disconnected { session_id }).await;
    tracing::info!("session {} disconnected", session_id);

    Ok(())
}

/// Process one session event and execute its deliveries.
///
/// The driver lock is held across both steps so every event is handled to
/// completion, broadcasts included, before the next one starts.
async fn dispatch(
    driver: &Arc<Mutex<RelayDriver<SystemClock>>>,
    shared: &SharedState,
    event: SessionEvent,
) {
    let mut driver = driver.lock().await;
    let actions = driver.process_event(event);
    execute_actions(&driver, actions, shared).await;
}

/// Execute relay actions against the peer map.
async fn execute_actions(
    driver: &RelayDriver<SystemClock>,
    actions: Vec<RelayAction>,
    shared: &SharedState,
) {
    let peers = shared.peers.read().await;

    for action in actions {
        match action {
            RelayAction::SendToSession { session_id, event } => {
                if let Some(tx) = peers.get(&session_id) {
                    send_event(session_id, tx, &event);
                } else {
                    tracing::warn!("send to unknown session {}", session_id);
                }
            },

            RelayAction::BroadcastToRoom { room, event, exclude_session } => {
                for session_id in driver.sessions_in_room(&room) {
                    if Some(session_id) == exclude_session {
                        continue;
                    }
                    if let Some(tx) = peers.get(&session_id) {
                        send_event(session_id, tx, &event);
                    }
                }
            },

            RelayAction::BroadcastAll { event } => {
                for (session_id, tx) in peers.iter() {
                    send_event(*session_id, tx, &event);
                }
            },
        }
    }
}

/// Encode an event and queue it on a session's outbound channel.
fn send_event(session_id: SessionId, tx: &PeerSender, event: &ServerEvent) {
    match roomcast_proto::encode(event) {
        Ok(text) => {
            // A closed channel means the session is tearing down; the
            // disconnect path cleans up.
            if tx.send(Message::Text(text)).is_err() {
                tracing::debug!("session {} outbound channel closed", session_id);
            }
        },
        Err(e) => {
            tracing::error!("failed to encode event for session {}: {}", session_id, e);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade_request(origin: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("ws://127.0.0.1:3500/");
        if let Some(origin) = origin {
            builder = builder.header("origin", origin);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn empty_allow_list_accepts_any_origin() {
        let request = upgrade_request(Some("http://evil.example"));
        assert!(check_origin(&request, &[]).is_ok());

        let request = upgrade_request(None);
        assert!(check_origin(&request, &[]).is_ok());
    }

    #[test]
    fn listed_origin_is_accepted() {
        let allowed = vec!["http://localhost:5500".to_string()];
        let request = upgrade_request(Some("http://localhost:5500"));
        assert!(check_origin(&request, &allowed).is_ok());
    }

    #[test]
    fn unlisted_or_missing_origin_is_refused() {
        let allowed = vec!["http://localhost:5500".to_string()];

        let request = upgrade_request(Some("http://evil.example"));
        let response = check_origin(&request, &allowed).unwrap_err();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = upgrade_request(None);
        assert!(check_origin(&request, &allowed).is_err());
    }

    #[test]
    fn session_ids_are_distinct() {
        assert_ne!(random_session_id(), random_session_id());
    }
}
