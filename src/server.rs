//! The market server: TCP accept loop plus the sale clock task.
//!
//! One task per buyer connection, exactly one clock task, and two guarded
//! regions (ledger, registry) shared between them. The server keeps
//! accepting connections after the clock closes the market, so buyers can
//! still issue LIST queries against the final state.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::SaleClock;
use crate::config::MarketConfig;
use crate::error::MarketResult;
use crate::ledger::{InventoryLedger, SaleItem};
use crate::registry::ClientRegistry;
use crate::session;
use crate::traits::SystemTimeProvider;

/// A single-auctioneer marketplace server.
pub struct MarketServer {
    config: MarketConfig,
    ledger: InventoryLedger,
    registry: ClientRegistry,
    shutdown: CancellationToken,
}

impl MarketServer {
    /// Build a server whose ledger holds the configured catalogue.
    pub fn new(config: MarketConfig) -> Self {
        let items = config
            .items
            .iter()
            .map(|name| SaleItem::new(name.clone(), config.item_stock));
        Self {
            ledger: InventoryLedger::new(items),
            registry: ClientRegistry::new(),
            shutdown: CancellationToken::new(),
            config,
        }
    }

    /// Handle used to stop the accept loop, every session, and the clock.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The shared inventory ledger.
    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    /// The shared connection registry.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(self) -> MarketResult<()> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        info!("market server listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (tests bind to an ephemeral
    /// port and pass it in here).
    pub async fn serve(self, listener: TcpListener) -> MarketResult<()> {
        let clock = SaleClock::new(
            self.ledger.clone(),
            self.registry.clone(),
            SystemTimeProvider::new(),
            self.config.sale_window_secs,
            self.config.tick_interval,
            self.shutdown.clone(),
        );
        let clock_task = tokio::spawn(clock.run());

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("shutdown signal received, no longer accepting buyers");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            tokio::spawn(session::handle_connection(
                                stream,
                                self.registry.clone(),
                                self.ledger.clone(),
                                SystemTimeProvider::new(),
                                self.shutdown.clone(),
                            ));
                        }
                        Err(e) => {
                            warn!("accept error: {e}");
                        }
                    }
                }
            }
        }

        let _ = clock_task.await;
        info!("market server stopped");
        Ok(())
    }
}
