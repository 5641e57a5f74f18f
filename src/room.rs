//! Room manager
//!
//! Maps room identifiers to registries so multiple independent broadcast
//! domains coexist in one process. Rooms are created lazily on first join
//! and reclaimed once emptied; creation and reclamation synchronize on the
//! rooms lock so a concurrent joiner is never dropped.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broadcast::broadcast_to_room;
use crate::connection::Connection;
use crate::error::HubError;
use crate::message::Payload;
use crate::registry::Registry;
use crate::types::{ConnectionId, RoomId};

/// Owns every room's registry
///
/// Constructed once and passed to connection handlers explicitly; holds no
/// global state. Lock order is always rooms map first, then a registry.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: Mutex<HashMap<RoomId, Arc<Registry>>>,
}

impl RoomManager {
    /// Create a manager with no rooms
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room on first use
    ///
    /// Fails only if the registry rejects the connection as a duplicate.
    pub fn join_room(&self, room_id: &RoomId, conn: Connection) -> Result<(), HubError> {
        let mut rooms = self.rooms.lock();
        let registry = rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Registry::new()));
        registry.add(conn)?;
        Ok(())
    }

    /// Remove a connection from a room
    ///
    /// Returns the removed connection, or None if it was already gone.
    /// An emptied room is reclaimed under the same lock that guards
    /// creation, so a racing join either lands before the check or
    /// creates the room afresh.
    pub fn leave_room(&self, room_id: &RoomId, id: ConnectionId) -> Option<Connection> {
        let mut rooms = self.rooms.lock();
        let registry = rooms.get(room_id)?.clone();
        let removed = registry.remove(id);
        if registry.is_empty() {
            rooms.remove(room_id);
            debug!("Room {} reclaimed (empty)", room_id);
        }
        removed
    }

    /// The registry for a room, if the room currently exists
    pub fn registry(&self, room_id: &RoomId) -> Option<Arc<Registry>> {
        self.rooms.lock().get(room_id).cloned()
    }

    /// Broadcast a payload to a room, minus an optional excluded member
    ///
    /// Broadcasting to an absent room is a no-op. Members found dead
    /// during the fan-out are removed and their departure announced.
    pub async fn broadcast(&self, room_id: &RoomId, payload: &Payload, exclude: Option<ConnectionId>) {
        let Some(registry) = self.registry(room_id) else {
            return;
        };
        let dead = broadcast_to_room(&registry, payload, exclude).await;
        self.announce_departures(room_id, &registry, dead).await;
    }

    /// Broadcast a system-sender announcement to the whole room
    pub async fn announce(&self, room_id: &RoomId, text: impl Into<String>) {
        self.broadcast(room_id, &Payload::system(text), None).await;
    }

    /// Remove a connection and announce its departure to the room
    ///
    /// The removal is an atomic take: if a failed send already removed
    /// this connection, nothing is announced a second time.
    pub async fn disconnect(&self, room_id: &RoomId, id: ConnectionId) {
        let Some(conn) = self.leave_room(room_id, id) else {
            return;
        };
        info!("Client {} left room {}", conn.id, room_id);

        let Some(registry) = self.registry(room_id) else {
            return;
        };
        let notice = departure_notice(&conn);
        let dead = broadcast_to_room(&registry, &notice, None).await;
        self.announce_departures(room_id, &registry, dead).await;
    }

    /// Announce members dropped mid-broadcast, draining any further
    /// casualties those announcements uncover
    async fn announce_departures(
        &self,
        room_id: &RoomId,
        registry: &Arc<Registry>,
        mut dead: Vec<Connection>,
    ) {
        while let Some(conn) = dead.pop() {
            warn!("Client {} dropped from room {} after failed send", conn.id, room_id);
            let more = broadcast_to_room(registry, &departure_notice(&conn), None).await;
            dead.extend(more);
        }
        self.reclaim_if_empty(room_id, registry);
    }

    fn reclaim_if_empty(&self, room_id: &RoomId, registry: &Arc<Registry>) {
        let mut rooms = self.rooms.lock();
        if registry.is_empty() {
            // only reclaim the registry we drained, not a recreated room
            if let Some(current) = rooms.get(room_id) {
                if Arc::ptr_eq(current, registry) {
                    rooms.remove(room_id);
                    debug!("Room {} reclaimed (empty)", room_id);
                }
            }
        }
    }
}

fn departure_notice(conn: &Connection) -> Payload {
    Payload::system(format!("client #{} left the chat", conn.display_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    fn member(name: &str) -> (Connection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        let conn = Connection::new(ConnectionId::new(), Some(name.to_string()), tx);
        (conn, rx)
    }

    fn recv_text(rx: &mut mpsc::Receiver<Message>) -> String {
        match rx.try_recv() {
            Ok(Message::Text(text)) => text.to_string(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_join_creates_room_lazily() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        assert!(manager.registry(&room).is_none());

        let (alice, _alice_rx) = member("alice");
        manager.join_room(&room, alice).unwrap();

        let registry = manager.registry(&room).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, _alice_rx) = member("alice");

        manager.join_room(&room, alice.clone()).unwrap();
        let result = manager.join_room(&room, alice);

        assert!(matches!(result, Err(HubError::DuplicateConnection(_))));
    }

    #[test]
    fn test_emptied_room_is_reclaimed() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, _alice_rx) = member("alice");
        let alice_id = alice.id;
        manager.join_room(&room, alice).unwrap();

        assert!(manager.leave_room(&room, alice_id).is_some());
        assert!(manager.registry(&room).is_none());
    }

    #[test]
    fn test_second_leave_returns_none() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, _alice_rx) = member("alice");
        let (bob, _bob_rx) = member("bob");
        let alice_id = alice.id;
        manager.join_room(&room, alice).unwrap();
        manager.join_room(&room, bob).unwrap();

        assert!(manager.leave_room(&room, alice_id).is_some());
        assert!(manager.leave_room(&room, alice_id).is_none());
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let manager = RoomManager::new();
        let lobby = RoomId::public("lobby");
        let den = RoomId::private("carol", "dave");
        let (alice, mut alice_rx) = member("alice");
        let (carol, mut carol_rx) = member("carol");
        manager.join_room(&lobby, alice).unwrap();
        manager.join_room(&den, carol).unwrap();

        manager.broadcast(&lobby, &Payload::text("hi"), None).await;

        assert_eq!(recv_text(&mut alice_rx), "hi");
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_absent_room_is_noop() {
        let manager = RoomManager::new();
        manager
            .broadcast(&RoomId::public("ghost"), &Payload::text("hi"), None)
            .await;
    }

    #[tokio::test]
    async fn test_announce_uses_system_sender() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, mut alice_rx) = member("alice");
        manager.join_room(&room, alice).unwrap();

        manager.announce(&room, "maintenance in 5 minutes").await;

        let text = recv_text(&mut alice_rx);
        assert!(text.contains(r#""sender":"system""#));
        assert!(text.contains("maintenance in 5 minutes"));
    }

    #[tokio::test]
    async fn test_disconnect_announces_once() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, _alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        let alice_id = alice.id;
        manager.join_room(&room, alice).unwrap();
        manager.join_room(&room, bob).unwrap();

        manager.disconnect(&room, alice_id).await;
        manager.disconnect(&room, alice_id).await;

        let text = recv_text(&mut bob_rx);
        assert!(text.contains("client #alice left the chat"));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_member_departure_announced_to_survivors() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, mut alice_rx) = member("alice");
        let (bob, bob_rx) = member("bob");
        let bob_id = bob.id;
        manager.join_room(&room, alice).unwrap();
        manager.join_room(&room, bob).unwrap();

        // Bob dies uncleanly; the next broadcast discovers it
        drop(bob_rx);
        manager.broadcast(&room, &Payload::text("hi"), None).await;

        assert_eq!(recv_text(&mut alice_rx), "hi");
        let text = recv_text(&mut alice_rx);
        assert!(text.contains("client #bob left the chat"));

        let registry = manager.registry(&room).unwrap();
        assert!(!registry.contains(bob_id));
    }

    #[tokio::test]
    async fn test_all_members_dying_reclaims_room() {
        let manager = RoomManager::new();
        let room = RoomId::public("lobby");
        let (alice, alice_rx) = member("alice");
        let (bob, bob_rx) = member("bob");
        manager.join_room(&room, alice).unwrap();
        manager.join_room(&room, bob).unwrap();

        drop(alice_rx);
        drop(bob_rx);
        manager.broadcast(&room, &Payload::text("hi"), None).await;

        assert!(manager.registry(&room).is_none());
    }
}
