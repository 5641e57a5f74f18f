//! Error types for the chat hub
//!
//! Defines hub-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ConnectionId;

/// Hub-level errors
///
/// Covers handshake rejection, protocol failures on established
/// connections, and invariant violations in the registry.
#[derive(Debug, Error)]
pub enum HubError {
    /// WebSocket upgrade failed (malformed request or rejected route).
    /// Surfaced to the accept loop, never retried.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    /// WebSocket protocol error on an established connection
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A connection identifier was registered twice.
    /// Indicates a programming error; the operation is rejected.
    #[error("duplicate connection: {0}")]
    DuplicateConnection(ConnectionId),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message send errors
///
/// Occurs when delivering to a connection whose writer is gone.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection's transport is no longer writable
    #[error("transport closed")]
    TransportClosed,
}
