//! The inventory ledger: authoritative record of the pending item queue
//! and the currently active sale.
//!
//! All mutation happens under one `tokio::sync::Mutex`, so a purchase can
//! never observe a half-advanced sale and two racing purchases are
//! serialized by lock acquisition order. The sale clock owns lifecycle
//! (`advance` / `expire`); session handlers only ever decrement quantity
//! through `try_purchase`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{MarketError, MarketResult};

/// One item awaiting (or returned to) the pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleItem {
    /// Item name, unique within the queue.
    pub name: String,
    /// Units remaining.
    pub remaining: u64,
}

impl SaleItem {
    pub fn new(name: impl Into<String>, remaining: u64) -> Self {
        Self {
            name: name.into(),
            remaining,
        }
    }
}

/// The single item currently open for purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSale {
    /// Name of the item on sale.
    pub item: String,
    /// Units remaining. Authoritative only under the ledger lock; copies
    /// handed out by `snapshot` or `active_sale` may be stale and must not
    /// be used to make purchase decisions.
    pub remaining: u64,
    /// Unix timestamp at which the sale window closes.
    pub deadline: u64,
}

impl ActiveSale {
    /// Seconds left before the deadline at `now` (0 if passed).
    pub const fn time_remaining_at(&self, now: u64) -> u64 {
        self.deadline.saturating_sub(now)
    }
}

/// Why a purchase was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing is on sale right now.
    NoActiveSale,
    /// The named item is not the one currently on sale.
    WrongItem,
    /// Fewer units remain than were requested.
    InsufficientStock,
    /// The requested amount was zero or negative.
    NonPositiveAmount,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::NoActiveSale => "no item is currently on sale",
            Self::WrongItem => "that item is not the one on sale",
            Self::InsufficientStock => "not enough stock remaining",
            Self::NonPositiveAmount => "purchase amount must be at least 1",
        };
        write!(f, "{msg}")
    }
}

/// Outcome of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The purchase succeeded; `remaining` is the quantity left afterwards.
    Purchased {
        item: String,
        amount: u64,
        remaining: u64,
    },
    /// The purchase was rejected in full (no partial fulfillment).
    Rejected(RejectReason),
}

/// Consistent read-only view of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySnapshot {
    /// Items still awaiting their turn, front first.
    pub queue: Vec<SaleItem>,
    /// The active sale, if one is open.
    pub active: Option<ActiveSale>,
}

impl InventorySnapshot {
    /// Flatten the snapshot into an item-to-remaining map, with the active
    /// item folded in. Suitable for a `LIST_RESPONSE`.
    pub fn inventory_map(&self) -> BTreeMap<String, u64> {
        let mut map: BTreeMap<String, u64> = self
            .queue
            .iter()
            .map(|item| (item.name.clone(), item.remaining))
            .collect();
        if let Some(active) = &self.active {
            map.insert(active.item.clone(), active.remaining);
        }
        map
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    queue: VecDeque<SaleItem>,
    active: Option<ActiveSale>,
}

/// Authoritative inventory state, shared by the sale clock and every
/// session handler.
#[derive(Debug, Clone, Default)]
pub struct InventoryLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl InventoryLedger {
    /// Create a ledger holding the given items, sold front to back.
    pub fn new(items: impl IntoIterator<Item = SaleItem>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                queue: items.into_iter().collect(),
                active: None,
            })),
        }
    }

    /// Pop the front of the pending queue and open it for sale until
    /// `now + window_secs`.
    ///
    /// Called only by the sale clock when no sale is active. An empty
    /// queue yields [`MarketError::QueueExhausted`], the expected terminal
    /// signal rather than a failure.
    pub async fn advance(&self, now: u64, window_secs: u64) -> MarketResult<ActiveSale> {
        let mut inner = self.inner.lock().await;
        if inner.active.is_some() {
            return Err(MarketError::InvalidState(
                "advance called while a sale is active".into(),
            ));
        }
        let item = inner.queue.pop_front().ok_or(MarketError::QueueExhausted)?;
        let sale = ActiveSale {
            item: item.name,
            remaining: item.remaining,
            deadline: now + window_secs,
        };
        inner.active = Some(sale.clone());
        Ok(sale)
    }

    /// Atomically attempt to purchase `amount` units of `item` from the
    /// active sale.
    ///
    /// The check and the decrement happen under one lock acquisition, so
    /// the sum of successful purchases can never exceed the starting
    /// quantity and `remaining` can never go negative.
    pub async fn try_purchase(&self, item: &str, amount: i64) -> PurchaseOutcome {
        if amount < 1 {
            return PurchaseOutcome::Rejected(RejectReason::NonPositiveAmount);
        }
        let amount = amount as u64;

        let mut inner = self.inner.lock().await;
        let Some(active) = inner.active.as_mut() else {
            return PurchaseOutcome::Rejected(RejectReason::NoActiveSale);
        };
        if active.item != item {
            return PurchaseOutcome::Rejected(RejectReason::WrongItem);
        }
        if amount > active.remaining {
            return PurchaseOutcome::Rejected(RejectReason::InsufficientStock);
        }

        active.remaining -= amount;
        PurchaseOutcome::Purchased {
            item: active.item.clone(),
            amount,
            remaining: active.remaining,
        }
    }

    /// Close the active sale.
    ///
    /// Unsold remainder is re-enqueued at the back of the pending queue,
    /// never discarded. Returns the requeued item, or `None` when the item
    /// sold out (or no sale was active).
    pub async fn expire(&self) -> Option<SaleItem> {
        let mut inner = self.inner.lock().await;
        let active = inner.active.take()?;
        if active.remaining == 0 {
            return None;
        }
        let unsold = SaleItem::new(active.item, active.remaining);
        debug!(item = %unsold.name, remaining = unsold.remaining, "requeueing unsold remainder");
        inner.queue.push_back(unsold.clone());
        Some(unsold)
    }

    /// Take a consistent view of the queue and the active sale.
    ///
    /// Taken under the same lock as the mutators, so an item can never
    /// appear both queued and active, or in neither.
    pub async fn snapshot(&self) -> InventorySnapshot {
        let inner = self.inner.lock().await;
        InventorySnapshot {
            queue: inner.queue.iter().cloned().collect(),
            active: inner.active.clone(),
        }
    }

    /// Copy of the active sale, if any. The copy may be stale immediately;
    /// it is informational only.
    pub async fn active_sale(&self) -> Option<ActiveSale> {
        self.inner.lock().await.active.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_item_ledger() -> InventoryLedger {
        InventoryLedger::new([SaleItem::new("flour", 5), SaleItem::new("sugar", 3)])
    }

    #[tokio::test]
    async fn test_advance_opens_front_item() {
        let ledger = two_item_ledger();
        let sale = ledger.advance(1000, 60).await.unwrap();

        assert_eq!(sale.item, "flour");
        assert_eq!(sale.remaining, 5);
        assert_eq!(sale.deadline, 1060);
    }

    #[tokio::test]
    async fn test_advance_empty_queue_is_exhausted() {
        let ledger = InventoryLedger::new([]);
        let result = ledger.advance(1000, 60).await;
        assert!(matches!(result, Err(MarketError::QueueExhausted)));
    }

    #[tokio::test]
    async fn test_advance_while_active_is_invalid() {
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();
        let result = ledger.advance(1001, 60).await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_purchase_decrements_remaining() {
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();

        let outcome = ledger.try_purchase("flour", 3).await;
        assert_eq!(
            outcome,
            PurchaseOutcome::Purchased {
                item: "flour".into(),
                amount: 3,
                remaining: 2
            }
        );
    }

    #[tokio::test]
    async fn test_purchase_without_active_sale() {
        let ledger = two_item_ledger();
        let outcome = ledger.try_purchase("flour", 1).await;
        assert_eq!(outcome, PurchaseOutcome::Rejected(RejectReason::NoActiveSale));
    }

    #[tokio::test]
    async fn test_purchase_wrong_item_rejected() {
        // Sugar exists later in the queue but flour is the active sale.
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();

        let outcome = ledger.try_purchase("sugar", 1).await;
        assert_eq!(outcome, PurchaseOutcome::Rejected(RejectReason::WrongItem));
    }

    #[tokio::test]
    async fn test_purchase_insufficient_stock_rejected_in_full() {
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();

        let outcome = ledger.try_purchase("flour", 6).await;
        assert_eq!(
            outcome,
            PurchaseOutcome::Rejected(RejectReason::InsufficientStock)
        );

        // No partial fulfillment: quantity untouched.
        let active = ledger.active_sale().await.unwrap();
        assert_eq!(active.remaining, 5);
    }

    #[tokio::test]
    async fn test_purchase_non_positive_amounts_rejected() {
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();

        for amount in [0, -1, i64::MIN] {
            let outcome = ledger.try_purchase("flour", amount).await;
            assert_eq!(
                outcome,
                PurchaseOutcome::Rejected(RejectReason::NonPositiveAmount)
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_purchases_never_oversell() {
        // Many tasks race for 5 units; the amounts
        // that succeed must sum to at most 5 and remaining never goes
        // negative.
        let ledger = InventoryLedger::new([SaleItem::new("flour", 5)]);
        ledger.advance(1000, 60).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(
                async move { ledger.try_purchase("flour", 3).await },
            ));
        }

        let mut bought = 0;
        let mut successes = 0;
        for handle in handles {
            if let PurchaseOutcome::Purchased { amount, .. } = handle.await.unwrap() {
                bought += amount;
                successes += 1;
            }
        }

        // 3 + 3 > 5, so exactly one of any two requests can win; with 8
        // racing requests of 3 only one fits.
        assert_eq!(successes, 1);
        assert_eq!(bought, 3);
        assert_eq!(ledger.active_sale().await.unwrap().remaining, 2);
    }

    #[tokio::test]
    async fn test_expire_requeues_unsold_remainder() {
        // Nothing bought: the full quantity returns to the back.
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();

        let requeued = ledger.expire().await;
        assert_eq!(requeued, Some(SaleItem::new("flour", 5)));

        let snapshot = ledger.snapshot().await;
        assert!(snapshot.active.is_none());
        assert_eq!(
            snapshot.queue,
            vec![SaleItem::new("sugar", 3), SaleItem::new("flour", 5)]
        );
    }

    #[tokio::test]
    async fn test_expire_after_sell_out_requeues_nothing() {
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();
        ledger.try_purchase("flour", 5).await;

        assert_eq!(ledger.expire().await, None);

        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.queue, vec![SaleItem::new("sugar", 3)]);
    }

    #[tokio::test]
    async fn test_expire_without_active_sale_is_noop() {
        let ledger = two_item_ledger();
        assert_eq!(ledger.expire().await, None);
        assert_eq!(ledger.snapshot().await.queue.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_not_torn() {
        // An item is never reported both queued and active, or dropped.
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();

        let snapshot = ledger.snapshot().await;
        let map = snapshot.inventory_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["flour"], 5);
        assert_eq!(map["sugar"], 3);
        assert_eq!(snapshot.queue.len(), 1);
        assert_eq!(snapshot.active.as_ref().unwrap().item, "flour");
    }

    #[tokio::test]
    async fn test_inventory_map_reflects_purchases() {
        let ledger = two_item_ledger();
        ledger.advance(1000, 60).await.unwrap();
        ledger.try_purchase("flour", 2).await;

        let map = ledger.snapshot().await.inventory_map();
        assert_eq!(map["flour"], 3);
    }

    #[test]
    fn test_time_remaining_saturates() {
        let sale = ActiveSale {
            item: "oil".into(),
            remaining: 2,
            deadline: 1060,
        };
        assert_eq!(sale.time_remaining_at(1030), 30);
        assert_eq!(sale.time_remaining_at(1060), 0);
        assert_eq!(sale.time_remaining_at(2000), 0);
    }
}
