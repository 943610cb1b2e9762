//! Price Oracle Port - External Price Feed Interface
//!
//! A single question asked of the outside world: what is the asset
//! trading at right now? Absence of an answer is a normal condition
//! (feed outage, timeout) and must never abort the caller's broader
//! operation — hence `Option`, not `Result`.

use async_trait::async_trait;

/// Trait for current-price providers.
///
/// Implementations make exactly one attempt with a fixed short timeout;
/// no retries. The settlement tick treats `None` as "skip this cycle".
#[async_trait]
pub trait PriceOracle: Send + Sync + 'static {
    /// Fetch the current price, or `None` if the feed is unavailable.
    async fn fetch_price(&self) -> Option<f64>;
}
