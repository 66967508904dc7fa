//! Live chat delivery
//!
//! Tracks open websocket connections per user. Messages are persisted
//! before they reach the hub, so delivery here is best-effort: a closed or
//! missing connection just means the recipient reads it from history.

use helix_shared::types::ServerEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

pub type ConnectionId = u64;

#[derive(Default)]
struct HubInner {
    connections: RwLock<HashMap<Uuid, Vec<(ConnectionId, mpsc::UnboundedSender<ServerEvent>)>>>,
    next_id: AtomicU64,
}

/// Registry of live connections keyed by user id
#[derive(Clone, Default)]
pub struct ChatHub {
    inner: Arc<HubInner>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`; events for that user arrive on
    /// the returned receiver until [`ChatHub::leave`] is called
    pub async fn join(
        &self,
        user_id: Uuid,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .connections
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push((id, tx));

        debug!(%user_id, connection = id, "Chat connection joined");
        (id, rx)
    }

    pub async fn leave(&self, user_id: Uuid, connection: ConnectionId) {
        let mut connections = self.inner.connections.write().await;
        if let Some(senders) = connections.get_mut(&user_id) {
            senders.retain(|(id, _)| *id != connection);
            if senders.is_empty() {
                connections.remove(&user_id);
            }
        }
        debug!(%user_id, connection, "Chat connection left");
    }

    /// Push `event` to every connection of `user_id`; returns how many
    /// connections accepted it
    pub async fn deliver(&self, user_id: Uuid, event: &ServerEvent) -> usize {
        let connections = self.inner.connections.read().await;
        connections
            .get(&user_id)
            .map(|senders| {
                senders
                    .iter()
                    .filter(|(_, tx)| tx.send(event.clone()).is_ok())
                    .count()
            })
            .unwrap_or(0)
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.connections.read().await.contains_key(&user_id)
    }
}
