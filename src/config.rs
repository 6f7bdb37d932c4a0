//! Configuration for the order book synchronizer.
//!
//! This module provides the [`BookConfig`] struct describing a single-symbol
//! book: which mode it runs in (full-depth incremental vs fixed-depth
//! periodic), sync timing, and buffer limits.

use std::time::Duration;

/// API endpoints (production or testnet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoints {
    /// Production endpoints
    #[default]
    Production,
    /// Spot testnet endpoints
    Testnet,
}

impl Endpoints {
    /// Get the base URL for the REST API
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Endpoints::Production => "https://api.binance.com",
            Endpoints::Testnet => "https://testnet.binance.vision",
        }
    }

    /// Get the base URL for raw WebSocket streams
    pub fn websocket_base_url(&self) -> &'static str {
        match self {
            Endpoints::Production => "wss://stream.binance.com:9443/ws",
            Endpoints::Testnet => "wss://testnet.binance.vision/ws",
        }
    }
}

/// Configuration for a single-symbol order book
///
/// # Modes
///
/// - `limit == None` (default): full-depth incremental mode. The book is
///   seeded from a REST snapshot and kept current through the diff-depth
///   stream, with sequence-range reconciliation.
/// - `limit == Some(n)`: fixed-depth mode. Every stream message is a full
///   top-`n` replacement; no REST fetch is made.
///
/// # Example
///
/// ```rust
/// use binance_orderbook::BookConfig;
/// use std::time::Duration;
///
/// let config = BookConfig::new("BTCUSDT")
///     .with_update_interval_ms(100)
///     .with_sync_timeout(Duration::from_secs(5));
///
/// let partial = BookConfig::new("BTCUSDT").with_limit(20);
/// ```
#[derive(Debug, Clone)]
pub struct BookConfig {
    /// Symbol the book tracks (uppercase, e.g. "BTCUSDT")
    symbol: String,

    /// Fixed book depth, or None for full-depth incremental mode
    limit: Option<u32>,

    /// Stream update interval in milliseconds (100 or 1000)
    update_interval_ms: Option<u32>,

    /// Depth requested for the REST snapshot (full-depth mode)
    snapshot_depth: u32,

    /// Delay between subscribing and fetching the snapshot
    snapshot_delay: Duration,

    /// Bound on waiting for the initial book during `start()`
    sync_timeout: Duration,

    /// Buffered-delta count that logs a warning
    buffer_soft_cap: usize,

    /// Buffered-delta count that fails the sync attempt
    buffer_hard_cap: usize,

    /// API endpoints
    endpoints: Endpoints,

    /// HTTP request timeout for the snapshot fetch
    http_timeout: Duration,
}

impl BookConfig {
    /// Create a configuration for the given symbol with defaults
    ///
    /// Defaults: full-depth mode, 5000-level snapshot, 200ms snapshot delay,
    /// 10s sync timeout, 500/2000 buffer caps, production endpoints.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            limit: None,
            update_interval_ms: None,
            snapshot_depth: 5000,
            snapshot_delay: Duration::from_millis(200),
            sync_timeout: Duration::from_secs(10),
            buffer_soft_cap: 500,
            buffer_hard_cap: 2000,
            endpoints: Endpoints::default(),
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Run in fixed-depth mode with the given number of levels (5, 10 or 20)
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the stream update interval in milliseconds (100 or 1000)
    #[must_use]
    pub fn with_update_interval_ms(mut self, interval_ms: u32) -> Self {
        self.update_interval_ms = Some(interval_ms);
        self
    }

    /// Set the depth requested for the REST snapshot
    #[must_use]
    pub fn with_snapshot_depth(mut self, depth: u32) -> Self {
        self.snapshot_depth = depth;
        self
    }

    /// Set the delay between subscribing and fetching the snapshot
    ///
    /// The delay biases the snapshot to land after the first streamed delta.
    /// It is an optimization; reconciliation handles either ordering.
    #[must_use]
    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = delay;
        self
    }

    /// Set the bound on waiting for the initial book during `start()`
    #[must_use]
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// Set the buffered-delta caps: warn at `soft`, fail the sync attempt at `hard`
    #[must_use]
    pub fn with_buffer_caps(mut self, soft: usize, hard: usize) -> Self {
        self.buffer_soft_cap = soft;
        self.buffer_hard_cap = hard;
        self
    }

    /// Set the API endpoints
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the HTTP request timeout for the snapshot fetch
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Get the symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the fixed depth, or None in full-depth mode
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Get the stream update interval in milliseconds
    pub fn update_interval_ms(&self) -> Option<u32> {
        self.update_interval_ms
    }

    /// Get the REST snapshot depth
    pub fn snapshot_depth(&self) -> u32 {
        self.snapshot_depth
    }

    /// Get the snapshot delay
    pub fn snapshot_delay(&self) -> Duration {
        self.snapshot_delay
    }

    /// Get the sync timeout
    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }

    /// Get the buffer soft cap
    pub fn buffer_soft_cap(&self) -> usize {
        self.buffer_soft_cap
    }

    /// Get the buffer hard cap
    pub fn buffer_hard_cap(&self) -> usize {
        self.buffer_hard_cap
    }

    /// Get the endpoints
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
    }

    /// Get the HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BookConfig::new("BTCUSDT");
        assert_eq!(config.symbol(), "BTCUSDT");
        assert_eq!(config.limit(), None);
        assert_eq!(config.snapshot_depth(), 5000);
        assert_eq!(config.snapshot_delay(), Duration::from_millis(200));
        assert_eq!(config.sync_timeout(), Duration::from_secs(10));
        assert_eq!(config.endpoints(), Endpoints::Production);
    }

    #[test]
    fn test_builder_pattern() {
        let config = BookConfig::new("ETHUSDT")
            .with_limit(20)
            .with_update_interval_ms(100)
            .with_buffer_caps(100, 400)
            .with_endpoints(Endpoints::Testnet);

        assert_eq!(config.limit(), Some(20));
        assert_eq!(config.update_interval_ms(), Some(100));
        assert_eq!(config.buffer_soft_cap(), 100);
        assert_eq!(config.buffer_hard_cap(), 400);
        assert!(config.endpoints().rest_base_url().contains("testnet"));
    }

    #[test]
    fn test_testnet_urls() {
        let endpoints = Endpoints::Testnet;
        assert!(endpoints.rest_base_url().contains("testnet"));
        assert!(endpoints.websocket_base_url().starts_with("wss://"));
    }
}
