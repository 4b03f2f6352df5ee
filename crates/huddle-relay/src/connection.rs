//! Per-connection handler: register, relay frames until the socket closes,
//! then clean up.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::config::RelayConfig;
use crate::protocol::{parse_envelope, ClientEnvelope, ServerEvent};
use crate::registry::RoomRegistry;

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    addr: SocketAddr,
    registry: RoomRegistry,
    config: RelayConfig,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Register unjoined. Room assignments only ever come over the wire.
    let (tx, mut rx) = mpsc::channel::<String>(config.queue_capacity);
    let conn_id = registry.connect(tx).await;

    tracing::info!(peer = %addr, conn = %conn_id, "Client connected");

    // 2. Relay loop.
    loop {
        tokio::select! {
            // Broadcasts queued for this connection → its WebSocket.
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client.
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_envelope(&text) {
                        Ok(ClientEnvelope::Join { room_id }) => {
                            if registry.join(conn_id, &room_id).await {
                                tracing::info!(conn = %conn_id, room = %room_id, "Joined room");
                                let ack = serde_json::to_string(&ServerEvent::Joined {
                                    room_id,
                                })
                                .unwrap();
                                if sink.send(Message::Text(ack.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(ClientEnvelope::Chat { message }) => {
                            match registry.room_of(conn_id).await {
                                Some(room) => {
                                    let exclude = config.exclude_sender.then_some(conn_id);
                                    let delivered =
                                        registry.broadcast(&room, &message, exclude).await;
                                    tracing::debug!(
                                        conn = %conn_id,
                                        room = %room,
                                        delivered,
                                        "Chat relayed"
                                    );
                                }
                                // Never joined: drop, don't guess a room.
                                None => {
                                    tracing::debug!(conn = %conn_id, "Chat before join dropped");
                                }
                            }
                        }
                        Err(e) => {
                            // Bad frames are dropped; the connection stays up.
                            tracing::warn!(peer = %addr, error = %e, "Dropping malformed frame");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 3. Cleanup. disconnect is idempotent, so a broadcast that already saw
    // the closed queue racing us is fine.
    registry.disconnect(conn_id).await;
    tracing::info!(peer = %addr, conn = %conn_id, "Client disconnected");
}
