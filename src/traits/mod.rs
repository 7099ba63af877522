//! Trait abstractions for dependency injection and testability.
//!
//! These seams let the sale clock be driven in tests with controllable
//! time and a recording notifier instead of real sockets.

pub mod notify;
pub mod time;

pub use notify::Notifier;
pub use time::TimeProvider;

// Re-export default implementations
pub use time::SystemTimeProvider;
