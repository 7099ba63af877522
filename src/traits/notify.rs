//! Broadcast abstraction decoupling the sale clock from live sockets.

use async_trait::async_trait;

use crate::protocol::ServerMessage;

/// Abstraction over best-effort delivery to every connected buyer.
///
/// Implemented by the connection registry in production and by a
/// recording mock in tests. Delivery is best-effort per recipient:
/// a failed recipient never fails the broadcast as a whole.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` to every registered session.
    ///
    /// Returns the number of sessions the message was handed to.
    async fn notify_all(&self, message: ServerMessage) -> usize;
}
