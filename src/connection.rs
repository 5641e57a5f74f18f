//! Connection struct definition
//!
//! Represents one accepted bidirectional session: identity plus the sender
//! half of the outbound channel drained by the connection's writer task.

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SendError;
use crate::types::ConnectionId;

/// One live connection
///
/// Cloneable handle; registry snapshots hold clones so broadcasts can
/// deliver without touching membership state. A connection is assumed
/// writable until a send fails.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Principal name (None for anonymous sessions)
    pub username: Option<String>,
    /// Hub → writer-task message channel
    sender: mpsc::Sender<Message>,
}

impl Connection {
    /// Create a new connection handle
    pub fn new(id: ConnectionId, username: Option<String>, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            username,
            sender,
        }
    }

    /// Deliver one message to this connection
    ///
    /// Suspends until the writer task accepts the frame. Returns an error
    /// if the writer is gone (peer disconnected).
    pub async fn send(&self, msg: Message) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::TransportClosed)
    }

    /// Request a graceful close of this connection
    ///
    /// Enqueues a Close frame for the writer task. Idempotent: calling it
    /// on an already-closed connection is a no-op.
    pub fn close(&self, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        let _ = self.sender.try_send(Message::Close(Some(frame)));
    }

    /// Display name for announcements
    ///
    /// Returns the username if present, otherwise "anonymous".
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_writer() {
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Connection::new(ConnectionId::new(), Some("alice".to_string()), tx);

        conn.send(Message::Text("hi".into())).await.unwrap();

        match rx.recv().await {
            Some(Message::Text(text)) => assert_eq!(text.as_str(), "hi"),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_after_writer_gone() {
        let (tx, rx) = mpsc::channel(8);
        let conn = Connection::new(ConnectionId::new(), None, tx);
        drop(rx);

        let result = conn.send(Message::Text("hi".into())).await;
        assert!(matches!(result, Err(SendError::TransportClosed)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Connection::new(ConnectionId::new(), Some("alice".to_string()), tx);

        conn.close("done");
        conn.close("done again");

        assert!(matches!(rx.recv().await, Some(Message::Close(_))));

        // Second close on a dead channel must not fault
        drop(rx);
        conn.close("and again");
    }

    #[tokio::test]
    async fn test_display_name_fallback() {
        let (tx, _rx) = mpsc::channel(8);
        let named = Connection::new(ConnectionId::new(), Some("alice".to_string()), tx.clone());
        let anonymous = Connection::new(ConnectionId::new(), None, tx);

        assert_eq!(named.display_name(), "alice");
        assert_eq!(anonymous.display_name(), "anonymous");
    }
}
