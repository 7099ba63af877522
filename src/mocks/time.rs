//! Mock time provider for testing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::traits::TimeProvider;

/// Mock time provider with controllable time value.
///
/// Clones share the underlying value, so a test can hold one handle and
/// advance time under a clock task holding another.
#[derive(Debug, Clone)]
pub struct MockTime {
    current_time: Arc<AtomicU64>,
}

impl MockTime {
    /// Create a new mock time provider starting at the specified timestamp.
    pub fn new(initial_time: u64) -> Self {
        Self {
            current_time: Arc::new(AtomicU64::new(initial_time)),
        }
    }

    /// Set the current time to a specific value.
    pub fn set(&self, timestamp: u64) {
        self.current_time.store(timestamp, Ordering::SeqCst);
    }

    /// Advance time by the specified number of seconds.
    pub fn advance(&self, seconds: u64) {
        self.current_time.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl TimeProvider for MockTime {
    fn now_unix(&self) -> u64 {
        self.current_time.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value_and_set() {
        let time = MockTime::new(1000);
        assert_eq!(time.now_unix(), 1000);

        time.set(2000);
        assert_eq!(time.now_unix(), 2000);
    }

    #[test]
    fn test_advance() {
        let time = MockTime::new(1000);
        time.advance(61);
        assert_eq!(time.now_unix(), 1061);
    }

    #[test]
    fn test_clones_share_state() {
        let time1 = MockTime::new(1000);
        let time2 = time1.clone();

        time1.advance(500);
        assert_eq!(time2.now_unix(), 1500);
    }
}
