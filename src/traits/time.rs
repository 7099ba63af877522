//! Clock seam for sale deadlines.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current Unix timestamp, in seconds.
///
/// Sale deadlines are absolute Unix timestamps, so everything that opens
/// a window or reports time remaining reads the clock through this seam.
/// Tests swap in a controllable clock instead of waiting out real windows.
pub trait TimeProvider: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now_unix(&self) -> u64;
}

/// System-clock implementation used by the running server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl SystemTimeProvider {
    pub const fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
