//! Mock implementations for testing.
//!
//! This module provides mock implementations of the trait abstractions
//! that allow unit testing without sockets or a real clock.

pub mod notify;
pub mod time;

pub use notify::MockNotifier;
pub use time::MockTime;
