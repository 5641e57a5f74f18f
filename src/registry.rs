//! Connection registry for one room
//!
//! The sole shared mutable resource: the set of active connections in one
//! broadcast domain. All mutation and snapshot creation happen under a
//! short-lived mutex that is never held across I/O, so a stalled
//! connection cannot block joins, leaves, or broadcasts to its siblings.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::error::HubError;
use crate::types::ConnectionId;

/// Membership set for one room
///
/// Keyed by connection identifier for O(1) add and remove. Each entry
/// carries a join sequence number so snapshots iterate in insertion order.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    members: HashMap<ConnectionId, Member>,
}

#[derive(Debug)]
struct Member {
    joined: u64,
    conn: Connection,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the registry
    ///
    /// Rejects an identifier that is already present; under correct usage
    /// this cannot happen, the check guards the no-duplicates invariant.
    pub fn add(&self, conn: Connection) -> Result<(), HubError> {
        let mut inner = self.inner.lock();
        if inner.members.contains_key(&conn.id) {
            return Err(HubError::DuplicateConnection(conn.id));
        }
        let joined = inner.next_seq;
        inner.next_seq += 1;
        inner.members.insert(conn.id, Member { joined, conn });
        Ok(())
    }

    /// Remove a connection by identifier
    ///
    /// Returns the removed connection, or None if it was already gone.
    /// Absent identifiers are not an error: a failed send and an explicit
    /// disconnect may race to remove the same member, and only one wins.
    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        self.inner.lock().members.remove(&id).map(|m| m.conn)
    }

    /// Point-in-time view of current members, in join order
    ///
    /// Joins and leaves after the snapshot was taken are invisible to
    /// iteration over it.
    pub fn snapshot(&self) -> Vec<Connection> {
        let inner = self.inner.lock();
        let mut members: Vec<&Member> = inner.members.values().collect();
        members.sort_by_key(|m| m.joined);
        members.iter().map(|m| m.conn.clone()).collect()
    }

    /// Whether the identifier is currently a member
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.lock().members.contains_key(&id)
    }

    /// Number of current members
    pub fn len(&self) -> usize {
        self.inner.lock().members.len()
    }

    /// Whether the registry has no members
    pub fn is_empty(&self) -> bool {
        self.inner.lock().members.is_empty()
    }
}
