//! Market Engine - Window Lifecycle and Settlement
//!
//! Owns the market state machine and the settlement algorithm. Driven by
//! a periodic timer: each tick closes the open market at the freshly
//! fetched price, pays (or refunds) bets, and immediately opens the next
//! window — one atomic unit of work against the ledger.
//!
//! The price is always fetched *before* the ledger lock is acquired, so
//! a slow or dead feed can never stall admissions; an unavailable price
//! simply defers settlement to the next tick.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::adapters::persistence::{Ledger, LedgerError};
use crate::config::MarketConfig;
use crate::domain::market::Market;
use crate::domain::settlement::{self, Outcome};
use crate::ports::oracle::PriceOracle;

/// What a settlement tick actually did.
#[derive(Debug, Clone)]
pub enum TickResult {
    /// Oracle had no price; nothing changed, retried next tick.
    PriceUnavailable,
    /// No market was open (first tick or earlier oracle outage);
    /// one was opened, nothing to settle yet.
    Opened(Market),
    /// A market was settled and the next one opened.
    Settled(SettlementSummary),
}

/// Summary of one settled market.
#[derive(Debug, Clone)]
pub struct SettlementSummary {
    /// Settled market id.
    pub market_id: i64,
    /// Window open price.
    pub open_price: f64,
    /// Window close price.
    pub close_price: f64,
    /// Tie or winning direction.
    pub outcome: Outcome,
    /// Bets touched (all marked resolved).
    pub bets: usize,
    /// Bets credited (refunds on a tie, winners otherwise).
    pub credited: usize,
    /// Total coins credited.
    pub coins_paid: i64,
    /// The freshly opened follow-up market.
    pub next_market_id: i64,
}

/// The clock-driven market lifecycle engine.
pub struct MarketEngine<O: PriceOracle> {
    ledger: Arc<Ledger>,
    oracle: Arc<O>,
    config: MarketConfig,
}

impl<O: PriceOracle> MarketEngine<O> {
    /// Wire up the engine.
    pub fn new(ledger: Arc<Ledger>, oracle: Arc<O>, config: MarketConfig) -> Self {
        Self {
            ledger,
            oracle,
            config,
        }
    }

    /// Make sure a market is open (startup and self-healing).
    ///
    /// Returns the open market, or `None` when the oracle had no price —
    /// in which case the next settlement tick retries.
    pub async fn ensure_open_market(&self) -> Result<Option<Market>, LedgerError> {
        let Some(price) = self.oracle.fetch_price().await else {
            warn!("Could not open market: price unavailable");
            return Ok(None);
        };

        let interval = self.interval();
        let market = self
            .ledger
            .exclusive(move |tx| {
                if let Some(existing) = tx.open_market()? {
                    return Ok(existing);
                }
                let now = Utc::now();
                tx.insert_open_market(price, now, now + interval)
            })
            .await?;

        info!(
            market_id = market.id,
            open_price = market.open_price,
            "Open market ensured"
        );
        Ok(Some(market))
    }

    /// One settlement tick: close the open market, pay out, reopen.
    ///
    /// The fetched price serves as both the close of the current window
    /// and the open of the next — close, payout, and reopen commit
    /// together or not at all.
    pub async fn settlement_tick(&self) -> Result<TickResult, LedgerError> {
        let Some(price) = self.oracle.fetch_price().await else {
            warn!("Skipping settlement: price unavailable");
            return Ok(TickResult::PriceUnavailable);
        };

        let epsilon = self.config.tie_epsilon;
        let multiplier = self.config.win_multiplier;
        let interval = self.interval();

        let result = self
            .ledger
            .exclusive(move |tx| {
                let now = Utc::now();

                let Some(market) = tx.open_market()? else {
                    // Self-healing: an earlier oracle outage left no
                    // window open. Start one and settle next tick.
                    let opened = tx.insert_open_market(price, now, now + interval)?;
                    return Ok(TickResult::Opened(opened));
                };

                tx.close_market(market.id, price, now)?;

                let bets = tx.unresolved_bets(market.id)?;
                let outcome = settlement::outcome(market.open_price, price, epsilon);
                let payouts = settlement::payouts(&bets, outcome, multiplier);

                let mut coins_paid = 0;
                for payout in &payouts {
                    tx.credit(payout.user_id, payout.amount)?;
                    coins_paid += payout.amount;
                }
                tx.mark_bets_resolved(market.id)?;

                let next = tx.insert_open_market(price, now, now + interval)?;

                Ok(TickResult::Settled(SettlementSummary {
                    market_id: market.id,
                    open_price: market.open_price,
                    close_price: price,
                    outcome,
                    bets: bets.len(),
                    credited: payouts.len(),
                    coins_paid,
                    next_market_id: next.id,
                }))
            })
            .await?;

        match &result {
            TickResult::Settled(summary) => info!(
                market_id = summary.market_id,
                open_price = summary.open_price,
                close_price = summary.close_price,
                outcome = summary.outcome.label(),
                bets = summary.bets,
                credited = summary.credited,
                coins_paid = summary.coins_paid,
                next_market_id = summary.next_market_id,
                "Market settled"
            ),
            TickResult::Opened(market) => info!(
                market_id = market.id,
                open_price = market.open_price,
                "No open market to settle; opened a new one"
            ),
            TickResult::PriceUnavailable => {}
        }

        Ok(result)
    }

    fn interval(&self) -> Duration {
        Duration::minutes(self.config.interval_minutes as i64)
    }
}
