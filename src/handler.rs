//! WebSocket connection handler
//!
//! Handles individual connections: WebSocket handshake with path-based
//! routing, room registration, the per-connection read loop, and cleanup
//! on disconnect.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::broadcast::send_personal;
use crate::connection::Connection;
use crate::error::HubError;
use crate::message::{Payload, ECHO_SENDER};
use crate::room::RoomManager;
use crate::types::{ConnectionId, RoomId};

/// Outbound channel depth per connection
const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Where an upgrade request lands, parsed from its URL path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/chatroom/{room}/{username}`: named public room
    Chatroom { room: RoomId, username: String },
    /// `/private/{peer}/{username}`: private pairing, order-insensitive
    Private { room: RoomId, username: String },
    /// `/ws`: plain echo endpoint
    Echo,
}

/// Parse an upgrade request path into a route
///
/// Returns None for anything that should be rejected at handshake time.
pub fn parse_route(path: &str) -> Option<Route> {
    let mut segments = path.trim_matches('/').split('/');
    let first = segments.next()?;
    let rest = (segments.next(), segments.next(), segments.next());

    match (first, rest) {
        ("ws", (None, None, None)) => Some(Route::Echo),
        ("chatroom", (Some(room), Some(username), None))
            if !room.is_empty() && !username.is_empty() =>
        {
            Some(Route::Chatroom {
                room: RoomId::public(room),
                username: username.to_string(),
            })
        }
        ("private", (Some(peer), Some(username), None))
            if !peer.is_empty() && !username.is_empty() =>
        {
            Some(Route::Private {
                room: RoomId::private(username, peer),
                username: username.to_string(),
            })
        }
        _ => None,
    }
}

/// How a room announces a new member
///
/// Public rooms use a raw text notice; private rooms wrap it in a
/// system-sender body.
enum JoinNotice {
    Text,
    System,
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, routes by URL path, and runs the
/// session until the peer disconnects.
pub async fn handle_connection(stream: TcpStream, hub: Arc<RoomManager>) -> Result<(), HubError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let mut route = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        match parse_route(req.uri().path()) {
            Some(r) => {
                route = Some(r);
                Ok(resp)
            }
            None => {
                let mut reject = ErrorResponse::new(Some("unknown chat route".to_string()));
                *reject.status_mut() = StatusCode::NOT_FOUND;
                Err(reject)
            }
        }
    })
    .await
    .map_err(HubError::Handshake)?;

    let Some(route) = route else {
        // a successful handshake always ran the callback
        return Ok(());
    };

    match route {
        Route::Echo => echo_session(ws_stream, &peer_addr).await,
        Route::Chatroom { room, username } => {
            chat_session(ws_stream, hub, room, username, JoinNotice::Text, &peer_addr).await
        }
        Route::Private { room, username } => {
            chat_session(ws_stream, hub, room, username, JoinNotice::System, &peer_addr).await
        }
    }
}

/// Run one chat session to completion
async fn chat_session(
    ws_stream: WebSocketStream<TcpStream>,
    hub: Arc<RoomManager>,
    room: RoomId,
    username: String,
    notice: JoinNotice,
    peer_addr: &str,
) -> Result<(), HubError> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!(
        "Client {} ({}) connected from {} to room {}",
        connection_id, username, peer_addr, room
    );

    // Create channel for hub -> writer-task messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER_SIZE);
    let conn = Connection::new(connection_id, Some(username.clone()), msg_tx);

    if let Err(e) = hub.join_room(&room, conn.clone()) {
        warn!("Rejecting client {} from room {}: {}", connection_id, room, e);
        let frame = CloseFrame {
            code: CloseCode::Policy,
            reason: "duplicate connection".into(),
        };
        let _ = ws_sender.send(Message::Close(Some(frame))).await;
        return Err(e);
    }

    // Announce the join to everyone already in the room
    let join_payload = match notice {
        JoinNotice::Text => Payload::text(format!("{} joined the chat", username)),
        JoinNotice::System => Payload::system(format!("{} joined the chat", username)),
    };
    hub.broadcast(&room, &join_payload, Some(connection_id)).await;
    info!("{} joined room {}", username, room);

    // Spawn write task (channel -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_sender.send(msg).await.is_err() {
                debug!("WebSocket send failed, ending write task");
                break;
            }
            if closing {
                break;
            }
        }
        debug!("Write task ended for client");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Spawn read task (WebSocket -> room broadcast + personal echo)
    let read_hub = Arc::clone(&hub);
    let read_room = room.clone();
    let read_conn = conn.clone();
    let read_username = username.clone();
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    read_hub
                        .broadcast(
                            &read_room,
                            &Payload::chat(&read_username, &text),
                            Some(read_conn.id),
                        )
                        .await;

                    // Echo back to the sender; failure means our own
                    // transport is dead
                    let echo = Payload::chat(ECHO_SENDER, &text);
                    if send_personal(&echo, &read_conn).await.is_err() {
                        debug!("Echo to {} failed, ending read task", read_conn.id);
                        break;
                    }

                    info!("{} says: {}", read_username, text);
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", read_conn.id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong is handled automatically by tungstenite
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", read_conn.id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", read_conn.id);
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection_id);
        }
    }

    // Cleanup runs once: if a failed send already removed us, the
    // departure was announced there and this is a no-op
    hub.disconnect(&room, connection_id).await;
    info!("{} left room {}", username, room);

    Ok(())
}

/// Run the plain echo session
///
/// Greets the peer, acknowledges every message, and closes on request
/// ("disconnect") or on a policy violation ("bad message").
async fn echo_session(
    ws_stream: WebSocketStream<TcpStream>,
    peer_addr: &str,
) -> Result<(), HubError> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    info!("Echo client connected from {}", peer_addr);
    ws_sender
        .send(Message::Text("Welcome to the chat room!".into()))
        .await?;

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                info!("Message received: {}", text);
                ws_sender.send(Message::Text("Message received".into())).await?;

                if text == "disconnect" {
                    warn!("Disconnecting {} ...", peer_addr);
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "Disconnecting...".into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await?;
                    break;
                }
                if text.contains("bad message") {
                    let frame = CloseFrame {
                        code: CloseCode::Policy,
                        reason: "Inappropriate message".into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await?;
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Echo client {} closed the connection", peer_addr);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Echo connection error for {}: {}", peer_addr, e);
                break;
            }
        }
    }

    Ok(())
}
