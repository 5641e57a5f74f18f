//! Basic type definitions for the chat hub
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based unique connection identifier
//! - `RoomId`: broadcast-domain identifier (public name or private pairing)

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier
///
/// Names one independent broadcast domain. A room is either a named public
/// chatroom or a private pairing of two usernames. Private pairings are
/// normalized so both participants resolve to the same room no matter who
/// dialed whom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Room ID for a named public chatroom
    pub fn public(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Room ID for a private pairing of two usernames
    ///
    /// The pair is ordered before composing the key, so
    /// `private("alice", "bob") == private("bob", "alice")`.
    /// The `private:` prefix keeps pairings disjoint from public room names.
    pub fn private(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("private:{first}:{second}"))
    }

    /// The room identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_public_room_keeps_name() {
        let room = RoomId::public("lobby");
        assert_eq!(room.as_str(), "lobby");
    }

    #[test]
    fn test_private_room_order_insensitive() {
        assert_eq!(
            RoomId::private("alice", "bob"),
            RoomId::private("bob", "alice")
        );
    }

    #[test]
    fn test_private_room_disjoint_from_public() {
        assert_ne!(RoomId::private("alice", "bob"), RoomId::public("alice"));
        assert_ne!(RoomId::private("alice", "bob"), RoomId::public("bob"));
    }
}
