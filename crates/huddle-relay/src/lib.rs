//! huddle-relay: room-based WebSocket message relay.
//!
//! Clients connect, send a `join` envelope naming a room, and every `chat`
//! payload gets fanned out to the room's current members as plain text
//! frames. Payloads are opaque — the relay never looks past the envelope.

pub mod config;
pub mod connection;
pub mod protocol;
pub mod registry;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

pub use crate::config::RelayConfig;
pub use crate::registry::{ConnectionId, RoomRegistry};

use crate::connection::handle_connection;

/// Accept WebSocket connections on `listener` until the serving task is
/// dropped. Each accepted stream gets its own handler task; handshake and
/// accept failures are logged and never abort the loop.
pub async fn serve(listener: TcpListener, registry: RoomRegistry, config: RelayConfig) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let registry = registry.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, registry, config).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
