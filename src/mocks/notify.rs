//! Mock notifier recording broadcasts for test assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::protocol::ServerMessage;
use crate::traits::Notifier;

/// Records every broadcast message instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    messages: Arc<Mutex<Vec<ServerMessage>>>,
    recipients: Arc<AtomicUsize>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recipient count reported back from `notify_all`, standing
    /// in for the number of connected sessions.
    pub fn set_recipients(&self, count: usize) {
        self.recipients.store(count, Ordering::SeqCst);
    }

    /// All messages broadcast so far, in order.
    pub async fn messages(&self) -> Vec<ServerMessage> {
        self.messages.lock().await.clone()
    }

    /// Number of broadcasts recorded.
    pub async fn message_count(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// Forget everything recorded so far.
    pub async fn clear(&self) {
        self.messages.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_all(&self, message: ServerMessage) -> usize {
        self.messages.lock().await.push(message);
        self.recipients.load(Ordering::SeqCst)
    }
}
