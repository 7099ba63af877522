//! `bazaar`: a live, time-boxed, single-auctioneer marketplace.
//!
//! One authoritative server sells a queue of items, each open for purchase
//! for a fixed window, to many concurrently connected buyers speaking a
//! JSON-lines protocol over TCP.

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use clock::SaleClock;
pub use config::MarketConfig;
pub use error::{MarketError, MarketResult};
pub use ledger::{
    ActiveSale, InventoryLedger, InventorySnapshot, PurchaseOutcome, RejectReason, SaleItem,
};
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{ClientRegistry, SessionId};
pub use server::MarketServer;
pub use traits::{Notifier, SystemTimeProvider, TimeProvider};
