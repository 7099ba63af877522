//! Configuration constants and startup configuration for the market server.
//!
//! This module centralizes magic numbers and configuration values
//! to improve maintainability and enable easier tuning.

use std::time::Duration;

use crate::error::{MarketError, MarketResult};

/// Default address the server listens on.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port for the marketplace.
pub const DEFAULT_PORT: u16 = 5000;

/// How long each item stays open for purchase, in seconds.
pub const DEFAULT_SALE_WINDOW_SECS: u64 = 60;

/// Starting quantity for each item in the default catalogue.
pub const DEFAULT_ITEM_STOCK: u64 = 5;

/// Cadence of the advisory time-remaining broadcasts.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default item catalogue, sold in order.
pub const DEFAULT_ITEMS: [&str; 4] = ["flour", "sugar", "potato", "oil"];

/// Environment variable overriding the listen host.
pub const HOST_ENV: &str = "BAZAAR_HOST";

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "BAZAAR_PORT";

/// Environment variable overriding the item catalogue (comma-separated names).
pub const ITEMS_ENV: &str = "BAZAAR_ITEMS";

/// Environment variable overriding the starting stock per item.
pub const ITEM_STOCK_ENV: &str = "BAZAAR_ITEM_STOCK";

/// Environment variable overriding the sale window in seconds.
pub const SALE_WINDOW_ENV: &str = "BAZAAR_SALE_WINDOW_SECS";

/// Startup configuration for a market server instance.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Host address to bind the listener to.
    pub host: String,
    /// TCP port to bind the listener to.
    pub port: u16,
    /// Item names, sold front to back.
    pub items: Vec<String>,
    /// Starting quantity for every item.
    pub item_stock: u64,
    /// Duration each item stays on sale, in seconds.
    pub sale_window_secs: u64,
    /// Interval between time-remaining broadcasts.
    pub tick_interval: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            items: DEFAULT_ITEMS.iter().map(ToString::to_string).collect(),
            item_stock: DEFAULT_ITEM_STOCK,
            sale_window_secs: DEFAULT_SALE_WINDOW_SECS,
            tick_interval: TICK_INTERVAL,
        }
    }
}

impl MarketConfig {
    /// Build a configuration from environment variables, falling back to
    /// the defaults above for anything unset.
    pub fn from_env() -> MarketResult<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var(HOST_ENV) {
            config.host = host;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            config.port = port
                .parse()
                .map_err(|e| MarketError::Config(format!("Invalid {PORT_ENV} '{port}': {e}")))?;
        }
        if let Ok(items) = std::env::var(ITEMS_ENV) {
            let parsed: Vec<String> = items
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
            if parsed.is_empty() {
                return Err(MarketError::Config(format!(
                    "{ITEMS_ENV} must name at least one item"
                )));
            }
            config.items = parsed;
        }
        if let Ok(stock) = std::env::var(ITEM_STOCK_ENV) {
            config.item_stock = stock.parse().map_err(|e| {
                MarketError::Config(format!("Invalid {ITEM_STOCK_ENV} '{stock}': {e}"))
            })?;
        }
        if let Ok(window) = std::env::var(SALE_WINDOW_ENV) {
            config.sale_window_secs = window.parse().map_err(|e| {
                MarketError::Config(format!("Invalid {SALE_WINDOW_ENV} '{window}': {e}"))
            })?;
        }

        Ok(config)
    }

    /// The `host:port` string the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.items.len(), 4);
        assert_eq!(config.items[0], "flour");
        assert_eq!(config.sale_window_secs, 60);
    }

    #[test]
    fn test_listen_addr_format() {
        let config = MarketConfig::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:5000");
    }
}
