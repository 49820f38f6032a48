//! Error types for the signal server

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors while accepting or serving a connection
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The hub task has stopped
    #[error("hub closed")]
    HubClosed,

    #[error("handshake timed out")]
    HandshakeTimeout,
}

/// Failure to queue one event on a peer's outbox
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxError {
    #[error("outbox full")]
    Full,

    #[error("outbox closed")]
    Closed,
}
