//! Presence registry: maps a username to its single live connection.
//!
//! Registration is last-write-wins; a reconnect simply replaces the entry
//! without notifying or closing the previous connection. Unregistration is
//! guarded by the connection id so a stale disconnect cannot evict a newer
//! connection that has already taken the slot.

use async_trait::async_trait;
use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Result of attempting to push a payload to a user's live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered,
    Absent,
}

/// Store of live connections, injected into the relay so a multi-instance
/// deployment can swap the in-process map for an external registry.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Register `connection_id` as the live connection for `username`,
    /// replacing any previous entry.
    async fn register(&self, username: &str, connection_id: Uuid, sender: UnboundedSender<Message>);

    /// Remove the mapping only if it still points at `connection_id`.
    async fn unregister(&self, username: &str, connection_id: Uuid);

    /// Deliver `payload` to the user's connection if one is present.
    /// Fire-and-forget: an absent or dead connection is not an error, the
    /// message stays retrievable from durable history.
    async fn route_to(&self, username: &str, payload: Message) -> RouteOutcome;
}

struct Connection {
    id: Uuid,
    sender: UnboundedSender<Message>,
}

#[derive(Default, Clone)]
pub struct InMemoryPresence {
    inner: Arc<RwLock<HashMap<String, Connection>>>,
}

impl InMemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresence {
    async fn register(&self, username: &str, connection_id: Uuid, sender: UnboundedSender<Message>) {
        let mut guard = self.inner.write().await;
        guard.insert(
            username.to_string(),
            Connection {
                id: connection_id,
                sender,
            },
        );
    }

    async fn unregister(&self, username: &str, connection_id: Uuid) {
        let mut guard = self.inner.write().await;
        if let Some(current) = guard.get(username) {
            if current.id == connection_id {
                guard.remove(username);
            }
        }
    }

    async fn route_to(&self, username: &str, payload: Message) -> RouteOutcome {
        let stale_id = {
            let guard = self.inner.read().await;
            match guard.get(username) {
                Some(conn) => match conn.sender.send(payload) {
                    Ok(()) => return RouteOutcome::Delivered,
                    // Receiver dropped: the connection is dead but has not
                    // unregistered yet.
                    Err(_) => conn.id,
                },
                None => return RouteOutcome::Absent,
            }
        };

        let mut guard = self.inner.write().await;
        if let Some(current) = guard.get(username) {
            if current.id == stale_id {
                guard.remove(username);
            }
        }
        RouteOutcome::Absent
    }
}
