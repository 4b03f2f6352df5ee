//! Room registry: the relay's one piece of shared state. Tracks each live
//! connection's outbound queue and current room, plus the inverse room index
//! used for fan-out.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;

/// Server-assigned identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a broadcast could not reach one recipient.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("recipient queue full")]
    Backpressure,

    #[error("recipient disconnected")]
    Closed,
}

struct Member {
    tx: mpsc::Sender<String>,
    room: Option<String>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    connections: HashMap<ConnectionId, Member>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Thread-safe registry handle. Clones share the same store, so the accept
/// loop, the handlers, and tests can all hold one instance.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Register a connection with no room. `tx` is the connection's bounded
    /// outbound queue; broadcasts get pushed into it.
    pub async fn connect(&self, tx: mpsc::Sender<String>) -> ConnectionId {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = ConnectionId(inner.next_id);
        inner.connections.insert(id, Member { tx, room: None });
        id
    }

    /// Assign `id` to `room`, leaving any previous room. Last join wins.
    /// Returns false if the connection is no longer registered.
    pub async fn join(&self, id: ConnectionId, room: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let previous = match inner.connections.get_mut(&id) {
            Some(member) => member.room.replace(room.to_string()),
            None => return false,
        };
        if let Some(previous) = previous {
            remove_from_room(&mut inner.rooms, &previous, id);
        }
        inner.rooms.entry(room.to_string()).or_default().insert(id);
        true
    }

    /// Drop every record of `id`. Safe for connections that already left or
    /// never joined.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().await;
        remove_connection(&mut inner, id);
    }

    /// The room `id` currently belongs to, if any.
    pub async fn room_of(&self, id: ConnectionId) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.connections.get(&id)?.room.clone()
    }

    /// Queue `message` for every member of `room`, skipping `exclude`.
    /// Recipient failures stay contained: a full queue drops the frame for
    /// that recipient only, a closed queue unregisters it. Returns how many
    /// members the frame was queued for.
    pub async fn broadcast(
        &self,
        room: &str,
        message: &str,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let mut inner = self.inner.lock().await;
        let members: Vec<ConnectionId> = match inner.rooms.get(room) {
            Some(ids) => ids.iter().copied().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for id in members {
            if exclude == Some(id) {
                continue;
            }
            let Some(member) = inner.connections.get(&id) else {
                continue;
            };
            match try_deliver(member, message) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Backpressure) => {
                    tracing::warn!(conn = %id, room = %room, "Outbound queue full, dropping frame");
                }
                Err(DeliveryError::Closed) => dead.push(id),
            }
        }

        for id in dead {
            tracing::debug!(conn = %id, room = %room, "Recipient gone, unregistering");
            remove_connection(&mut inner, id);
        }

        delivered
    }

    /// Number of live connections, joined or not.
    pub async fn count(&self) -> usize {
        self.inner.lock().await.connections.len()
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }
}

fn try_deliver(member: &Member, message: &str) -> Result<(), DeliveryError> {
    member.tx.try_send(message.to_string()).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::Backpressure,
        TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

fn remove_connection(inner: &mut Inner, id: ConnectionId) {
    if let Some(member) = inner.connections.remove(&id) {
        if let Some(room) = member.room {
            remove_from_room(&mut inner.rooms, &room, id);
        }
    }
}

fn remove_from_room(
    rooms: &mut HashMap<String, HashSet<ConnectionId>>,
    room: &str,
    id: ConnectionId,
) {
    if let Some(ids) = rooms.get_mut(room) {
        ids.remove(&id);
        if ids.is_empty() {
            rooms.remove(room);
        }
    }
}
