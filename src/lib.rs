//! Multi-Room WebSocket Chat Hub Library
//!
//! A WebSocket chat hub built with tokio-tungstenite: a process-wide
//! registry of live connections shared across independent chat rooms.
//!
//! # Features
//! - WebSocket connection handling with path-based routing
//! - Named public chatrooms and private two-party pairings
//! - Broadcast with per-sender exclusion and personal echoes
//! - Departure announcements on disconnect
//! - Per-member failure isolation: one dead connection never aborts
//!   delivery to the rest
//!
//! # Architecture
//! The `RoomManager` owns one `Registry` per room behind short-lived
//! mutexes. Broadcasts copy a point-in-time snapshot of membership and
//! fan out concurrently, so no lock is ever held across I/O. Each
//! connection runs its own read loop and writer task; the registry is
//! the only shared mutable state.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_hub::{handle_connection, RoomManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let hub = Arc::new(RoomManager::new());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let hub = Arc::clone(&hub);
//!         tokio::spawn(handle_connection(stream, hub));
//!     }
//! }
//! ```

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{broadcast_to_room, send_personal};
pub use connection::Connection;
pub use error::{HubError, SendError};
pub use handler::{handle_connection, Route};
pub use message::{Payload, ECHO_SENDER, SYSTEM_SENDER};
pub use registry::Registry;
pub use room::RoomManager;
pub use types::{ConnectionId, RoomId};
