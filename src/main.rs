//! Market server - main entry point.

use bazaar::error::MarketResult;
use bazaar::{MarketConfig, MarketServer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> MarketResult<()> {
    init_logging();

    let config = MarketConfig::from_env()?;
    info!(
        "Starting market: {} items, {} units each, {}s window",
        config.items.len(),
        config.item_stock,
        config.sale_window_secs
    );

    let server = MarketServer::new(config);

    // Ctrl+C cancels the shutdown token: the accept loop, every session,
    // and the sale clock all stop on it.
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    server.run().await
}
