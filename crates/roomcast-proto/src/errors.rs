//! Protocol error types.

/// Errors from decoding or encoding wire events.
///
/// Decoding fails on malformed JSON, an unknown `event` tag, or a payload
/// whose shape does not match the tag. All of these are the transport
/// boundary's responsibility to reject; the relay core never sees a
/// malformed event.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The text frame was not a valid event envelope.
    #[error("malformed event envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}
