//! Broadcast engine
//!
//! Delivers one payload to a snapshot of a room's membership, minus an
//! optional excluded connection, isolating per-member failures. The
//! payload is encoded once and fanned out concurrently, so one stalled
//! connection only delays its own delivery. Members whose transport turns
//! out dead are removed from the registry and handed back to the caller.

use futures_util::future::join_all;
use tracing::{error, warn};

use crate::connection::Connection;
use crate::error::SendError;
use crate::message::Payload;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Broadcast a payload to every member of the room except `exclude`
///
/// Exclusion matches on connection identity, not principal name: two
/// connections from the same user are distinct. A failed send is logged,
/// the member is removed from the registry, and delivery to the remaining
/// members continues. Returns the members removed this way so the caller
/// can announce their departure.
///
/// Each call completes its whole fan-out before returning, so broadcasts
/// issued in sequence by one task arrive in that order at every recipient.
pub async fn broadcast_to_room(
    registry: &Registry,
    payload: &Payload,
    exclude: Option<ConnectionId>,
) -> Vec<Connection> {
    let msg = match payload.to_message() {
        Ok(msg) => msg,
        Err(e) => {
            error!("Failed to serialize broadcast payload: {}", e);
            return Vec::new();
        }
    };

    let recipients: Vec<Connection> = registry
        .snapshot()
        .into_iter()
        .filter(|conn| Some(conn.id) != exclude)
        .collect();

    let sends = recipients.iter().map(|conn| conn.send(msg.clone()));
    let results = join_all(sends).await;

    let mut dead = Vec::new();
    for (conn, result) in recipients.iter().zip(results) {
        if result.is_err() {
            warn!("Send to {} failed, dropping it from the room", conn.id);
            // remove() is an atomic take; a concurrent disconnect may win
            if let Some(removed) = registry.remove(conn.id) {
                dead.push(removed);
            }
        }
    }
    dead
}

/// Deliver a payload to exactly one connection
///
/// Bypasses room exclusion. A failure means the target's transport is
/// dead; the caller is responsible for removing it from its room.
pub async fn send_personal(payload: &Payload, conn: &Connection) -> Result<(), SendError> {
    let msg = match payload.to_message() {
        Ok(msg) => msg,
        Err(e) => {
            error!("Failed to serialize personal payload: {}", e);
            return Ok(());
        }
    };
    conn.send(msg).await
}
