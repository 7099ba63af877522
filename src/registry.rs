//! The connection registry: the set of currently connected buyer sessions.
//!
//! Sessions register an outbound channel sender on connect and are removed
//! on disconnect, or eagerly when a broadcast finds their channel closed.
//! Broadcast snapshots the membership under the lock and delivers after
//! releasing it, so delivery never blocks registration or other sends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::protocol::ServerMessage;
use crate::traits::Notifier;

/// Identifies one buyer session for the lifetime of its connection.
pub type SessionId = u64;

/// Shared registry of live buyer sessions.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, mpsc::UnboundedSender<ServerMessage>>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session and return its id.
    pub async fn register(&self, sender: mpsc::UnboundedSender<ServerMessage>) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.lock().await.insert(id, sender);
        debug!(session = id, "session registered");
        id
    }

    /// Remove a session. Idempotent: unknown ids are ignored, so cleanup
    /// can race with broadcast-triggered removal safely.
    pub async fn unregister(&self, id: SessionId) {
        if self.sessions.lock().await.remove(&id).is_some() {
            debug!(session = id, "session unregistered");
        }
    }

    /// Deliver `message` to every registered session.
    ///
    /// Membership is copied out under the lock and the lock released before
    /// any delivery, so a session connecting or disconnecting mid-broadcast
    /// can never corrupt the iteration. A recipient whose channel is closed
    /// is removed; its failure never aborts delivery to the others.
    pub async fn broadcast(&self, message: ServerMessage) -> usize {
        let recipients: Vec<(SessionId, mpsc::UnboundedSender<ServerMessage>)> = {
            let sessions = self.sessions.lock().await;
            sessions
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in recipients {
            if tx.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut sessions = self.sessions.lock().await;
            for id in dead {
                if sessions.remove(&id).is_some() {
                    debug!(session = id, "removed dead session during broadcast");
                }
            }
        }

        delivered
    }

    /// Number of currently registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl Notifier for ClientRegistry {
    async fn notify_all(&self, message: ServerMessage) -> usize {
        self.broadcast(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await;
        assert_eq!(registry.len().await, 1);

        registry.unregister(id).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await;
        registry.unregister(id).await;
        registry.unregister(id).await;
        registry.unregister(9999).await;

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_sessions() {
        let registry = ClientRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register(tx1).await;
        registry.register(tx2).await;

        let delivered = registry.broadcast(ServerMessage::Welcome).await;

        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await, Some(ServerMessage::Welcome));
        assert_eq!(rx2.recv().await, Some(ServerMessage::Welcome));
    }

    #[tokio::test]
    async fn test_broadcast_removes_dead_session_and_continues() {
        let registry = ClientRegistry::new();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        registry.register(dead_tx).await;
        registry.register(live_tx).await;

        // Simulate a disconnected buyer: its receiving end is gone.
        drop(dead_rx);

        let delivered = registry
            .broadcast(ServerMessage::TimeLeft { time_left: 30 })
            .await;

        assert_eq!(delivered, 1);
        assert_eq!(
            live_rx.recv().await,
            Some(ServerMessage::TimeLeft { time_left: 30 })
        );
        // Dead session was removed, not retried.
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_registry() {
        let registry = ClientRegistry::new();
        let delivered = registry.broadcast(ServerMessage::Welcome).await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let registry = ClientRegistry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let a = registry.register(tx1).await;
        let b = registry.register(tx2).await;
        assert_ne!(a, b);
    }
}
