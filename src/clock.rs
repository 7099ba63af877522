//! The sale clock: the state machine that decides when items start and
//! stop being sellable.
//!
//! One clock task runs per server: `Idle → Selling → Idle → … → Closed`.
//! It is the only writer of sale lifecycle (opening via `advance`, closing
//! via `expire`); purchase handlers only ever decrease the remaining
//! quantity inside an open window. The countdown re-checks the deadline
//! and the sold-out condition on every tick rather than sleeping the whole
//! window, so an early sell-out ends the sale promptly.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::MarketError;
use crate::ledger::{ActiveSale, InventoryLedger};
use crate::protocol::ServerMessage;
use crate::traits::{Notifier, TimeProvider};

/// Drives the item queue through timed sale windows.
pub struct SaleClock<T, N>
where
    T: TimeProvider,
    N: Notifier,
{
    ledger: InventoryLedger,
    notifier: N,
    time: T,
    window_secs: u64,
    tick_interval: Duration,
    shutdown: CancellationToken,
}

impl<T, N> SaleClock<T, N>
where
    T: TimeProvider,
    N: Notifier,
{
    pub fn new(
        ledger: InventoryLedger,
        notifier: N,
        time: T,
        window_secs: u64,
        tick_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            notifier,
            time,
            window_secs,
            tick_interval,
            shutdown,
        }
    }

    /// Run the clock until the queue is exhausted or shutdown is signalled.
    ///
    /// The server keeps accepting connections after the clock closes; LIST
    /// queries then run against the final (empty) inventory.
    pub async fn run(self) {
        loop {
            if self.shutdown.is_cancelled() {
                info!("sale clock stopping on shutdown signal");
                return;
            }

            let sale = match self.ledger.advance(self.time.now_unix(), self.window_secs).await {
                Ok(sale) => sale,
                Err(MarketError::QueueExhausted) => {
                    info!("pending queue exhausted, market closed");
                    return;
                }
                Err(e) => {
                    error!("sale clock cannot advance: {e}");
                    return;
                }
            };

            info!(
                item = %sale.item,
                remaining = sale.remaining,
                window_secs = self.window_secs,
                "item opened for sale"
            );
            self.notifier
                .notify_all(ServerMessage::Item {
                    item: sale.item.clone(),
                    amount_left: sale.remaining,
                    time_left: self.window_secs,
                })
                .await;

            self.run_sale_window().await;

            match self.ledger.expire().await {
                Some(unsold) => {
                    info!(
                        item = %unsold.name,
                        remaining = unsold.remaining,
                        "sale window closed with unsold stock, requeued"
                    );
                }
                None => {
                    info!(item = %sale.item, "item sold out");
                    self.notifier
                        .notify_all(ServerMessage::SoldOut { item: sale.item })
                        .await;
                }
            }
        }
    }

    /// Tick until the deadline passes, the item sells out, or shutdown.
    ///
    /// Each tick broadcasts an advisory `TIME_LEFT`; the cadence carries no
    /// correctness weight, only the accept/reject of purchases does.
    async fn run_sale_window(&self) {
        loop {
            let Some(active) = self.ledger.active_sale().await else {
                return;
            };
            if self.sale_is_over(&active) {
                return;
            }

            self.notifier
                .notify_all(ServerMessage::TimeLeft {
                    time_left: active.time_remaining_at(self.time.now_unix()),
                })
                .await;

            tokio::select! {
                () = self.shutdown.cancelled() => return,
                () = tokio::time::sleep(self.tick_interval) => {}
            }
        }
    }

    fn sale_is_over(&self, active: &ActiveSale) -> bool {
        active.remaining == 0 || self.time.now_unix() >= active.deadline
    }
}
