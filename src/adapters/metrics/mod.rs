//! Prometheus Metrics Registry - Game Observability
//!
//! Registers and exposes Prometheus metrics for dashboards. Covers bet
//! flow, settlement outcomes, coin movement, reward claims, and oracle
//! health. Served on /metrics by the main HTTP router.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Centralized Prometheus metrics for the prediction game.
///
/// All metrics follow the naming convention `coinpredict_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Bets admitted, by direction.
    pub bets_placed: IntCounterVec,
    /// Bets rejected, by rejection code.
    pub bets_rejected: IntCounterVec,
    /// Markets settled, by outcome (up/down/tie).
    pub markets_settled: IntCounterVec,
    /// Total coins credited by settlement (payouts and refunds).
    pub coins_paid: IntCounter,
    /// Daily reward grants.
    pub reward_claims: IntCounter,
    /// Price fetches that returned nothing.
    pub oracle_failures: IntCounter,
    /// Last observed BTC/USD price, floored to whole dollars.
    pub last_price_usd: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bets_placed = IntCounterVec::new(
            Opts::new("coinpredict_bets_placed_total", "Total bets admitted"),
            &["direction"],
        )?;

        let bets_rejected = IntCounterVec::new(
            Opts::new("coinpredict_bets_rejected_total", "Total bets rejected"),
            &["reason"],
        )?;

        let markets_settled = IntCounterVec::new(
            Opts::new("coinpredict_markets_settled_total", "Total markets settled"),
            &["outcome"],
        )?;

        let coins_paid = IntCounter::new(
            "coinpredict_coins_paid_total",
            "Total coins credited by settlement",
        )?;

        let reward_claims = IntCounter::new(
            "coinpredict_reward_claims_total",
            "Total daily reward grants",
        )?;

        let oracle_failures = IntCounter::new(
            "coinpredict_oracle_failures_total",
            "Price fetches that returned no usable price",
        )?;

        let last_price_usd = IntGauge::new(
            "coinpredict_last_price_usd",
            "Last observed BTC/USD price in whole dollars",
        )?;

        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(bets_rejected.clone()))?;
        registry.register(Box::new(markets_settled.clone()))?;
        registry.register(Box::new(coins_paid.clone()))?;
        registry.register(Box::new(reward_claims.clone()))?;
        registry.register(Box::new(oracle_failures.clone()))?;
        registry.register(Box::new(last_price_usd.clone()))?;

        Ok(Self {
            registry,
            bets_placed,
            bets_rejected,
            markets_settled,
            coins_paid,
            reward_claims,
            oracle_failures,
            last_price_usd,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
