//! Outbound payload definitions
//!
//! Two wire shapes exist: raw UTF-8 text, and a structured JSON body with a
//! sender label and a message field. Inbound frames are opaque to the hub
//! and forwarded verbatim inside the structured body.

use serde::Serialize;
use tokio_tungstenite::tungstenite::Message;

/// Reserved sender label for hub-originated announcements
pub const SYSTEM_SENDER: &str = "system";

/// Sender label used when echoing a message back to its author
pub const ECHO_SENDER: &str = "You";

/// One outbound message payload
///
/// Exists only for the duration of delivery; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Raw text frame, sent as-is
    Text(String),
    /// Structured chat body, sent as JSON
    Chat { sender: String, message: String },
}

impl Payload {
    /// Raw text payload
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Structured chat payload from a named sender
    pub fn chat(sender: &str, message: &str) -> Self {
        Self::Chat {
            sender: sender.to_string(),
            message: message.to_string(),
        }
    }

    /// Structured announcement from the reserved system sender
    pub fn system(message: impl Into<String>) -> Self {
        Self::Chat {
            sender: SYSTEM_SENDER.to_string(),
            message: message.into(),
        }
    }

    /// Encode the payload as a WebSocket text frame
    ///
    /// Raw text goes out unquoted; structured bodies are serialized to JSON.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        match self {
            Payload::Text(text) => Ok(Message::Text(text.clone().into())),
            chat => Ok(Message::Text(serde_json::to_string(chat)?.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_payload_serialize() {
        let payload = Payload::chat("alice", "hello");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"sender":"alice","message":"hello"}"#);
    }

    #[test]
    fn test_system_payload_uses_reserved_sender() {
        let payload = Payload::system("bob joined the chat");
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""sender":"system""#));
    }

    #[test]
    fn test_text_payload_is_raw() {
        let msg = Payload::text("plain greeting").to_message().unwrap();
        match msg {
            Message::Text(text) => assert_eq!(text.as_str(), "plain greeting"),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_chat_payload_to_message_is_json() {
        let msg = Payload::chat("alice", "hi").to_message().unwrap();
        match msg {
            Message::Text(text) => {
                assert!(text.starts_with('{'));
                assert!(text.contains(r#""message":"hi""#));
            }
            other => panic!("expected text frame, got {:?}", other),
        }
    }
}
