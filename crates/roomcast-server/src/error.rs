//! Server error types.

/// Errors from the server runtime.
///
/// Malformed inbound frames are deliberately absent: they are rejected at
/// the transport boundary with a log line, never surfaced as a failure of
/// the relay itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket-level failure (bind, accept, local address lookup).
    ///
    /// Fatal for `bind`; accept errors during `run` are logged and the
    /// listener keeps going.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake with a client failed.
    ///
    /// Only that connection is affected; the client may retry.
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = ServerError::from(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "address in use",
        ));
        assert_eq!(err.to_string(), "socket error: address in use");
    }
}
