//! Transport error types

use thiserror::Error;

/// Fatal channel-level failure. Any of these settles the session as failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("WebSocket connection error: {0}")]
    Connect(String),
    #[error("Channel is not open")]
    NotOpen,
    #[error("Failed to encode request: {0}")]
    Encode(String),
    #[error("Failed to send request: {0}")]
    Send(String),
    #[error("WebSocket error: {0}")]
    Receive(String),
    #[error("Connection closed before the server sent a result")]
    ClosedBeforeOutcome,
    #[error("Connection closed by the caller")]
    ClosedByCaller,
    #[error("Timed out waiting for the strategy service")]
    Timeout,
}
