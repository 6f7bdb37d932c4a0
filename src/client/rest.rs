//! HTTP client for the depth snapshot endpoint.
//!
//! The order book only needs one REST call, `GET /api/v3/depth`, which is
//! public and unauthenticated.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::client::SnapshotSource;
use crate::config::BookConfig;
use crate::error::Error;
use crate::types::DepthSnapshot;

/// HTTP client for the public REST API
#[derive(Debug)]
pub struct BinanceRest {
    client: Client,
    base_url: String,
}

impl BinanceRest {
    /// Create a new REST client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &BookConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.endpoints().rest_base_url().to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current depth snapshot for a symbol
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure, [`Error::Api`] on a
    /// non-success status and [`Error::Json`] if the body does not parse.
    pub async fn depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot, Error> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.base_url, symbol, limit
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let snapshot: DepthSnapshot = serde_json::from_str(&body)?;

        debug!(
            symbol,
            last_update_id = snapshot.last_update_id,
            "fetched depth snapshot"
        );

        Ok(snapshot)
    }
}

#[async_trait]
impl SnapshotSource for BinanceRest {
    async fn fetch_snapshot(&self, symbol: &str, depth: u32) -> Result<DepthSnapshot, Error> {
        self.depth(symbol, depth).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_follows_endpoints() {
        let config = BookConfig::new("BTCUSDT");
        let rest = BinanceRest::new(&config).unwrap();
        assert_eq!(rest.base_url(), "https://api.binance.com");
    }
}
