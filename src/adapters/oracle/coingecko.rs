//! CoinGecko Price Oracle - BTC/USD Spot Price over HTTP
//!
//! Polls the CoinGecko simple-price endpoint. Every failure mode —
//! connect error, timeout, non-2xx status, malformed body — collapses
//! into `None`: the engine treats a missing price as "try again next
//! tick", never as an error to propagate.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::ports::oracle::PriceOracle;

/// CoinGecko simple-price response body.
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    bitcoin: CoinPrice,
}

/// Per-coin price entry.
#[derive(Debug, Deserialize)]
struct CoinPrice {
    usd: f64,
}

/// HTTP oracle backed by the CoinGecko public API.
pub struct CoinGeckoOracle {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoOracle {
    /// Build the oracle with the configured endpoint and timeout.
    pub fn new(config: &OracleConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    async fn request_price(&self) -> anyhow::Result<f64> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let body: SimplePriceResponse = response.json().await?;
        Ok(body.bitcoin.usd)
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn fetch_price(&self) -> Option<f64> {
        match self.request_price().await {
            Ok(price) if price.is_finite() && price > 0.0 => {
                debug!(price, "Fetched BTC/USD price");
                Some(price)
            }
            Ok(price) => {
                warn!(price, "Oracle returned an unusable price");
                None
            }
            Err(e) => {
                warn!(error = %e, "Price fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_simple_price_response() {
        let body = r#"{"bitcoin":{"usd":65432.1}}"#;
        let parsed: SimplePriceResponse = serde_json::from_str(body).unwrap();
        assert!((parsed.bitcoin.usd - 65432.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_body_without_bitcoin_key() {
        let body = r#"{"ethereum":{"usd":3000.0}}"#;
        assert!(serde_json::from_str::<SimplePriceResponse>(body).is_err());
    }
}
