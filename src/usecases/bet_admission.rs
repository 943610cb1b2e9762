//! Bet Admission - Validation and Atomic Placement
//!
//! Validates a single bet against the currently open market and records
//! it: balance check, stake debit, and bet insert are one unit of work,
//! so a racing duplicate attempt sees either the pre-debit or the
//! post-insert state, never an intermediate one.
//!
//! Precondition order is part of the contract — first failure wins:
//! rate limit, direction, amount bounds, open market, balance, duplicate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::persistence::{Ledger, LedgerError};
use crate::config::{MarketConfig, RateLimitConfig};
use crate::domain::bet::Direction;
use crate::usecases::rate_limiter::RateLimiter;

/// A bet request as delivered by a transport front-end.
///
/// `direction` stays raw here: parsing it is an admission precondition
/// with its own rejection code, not the transport's job.
#[derive(Debug, Clone)]
pub struct BetRequest {
    /// User placing the bet.
    pub user_id: i64,
    /// Display name (kept fresh on every interaction).
    pub username: String,
    /// Raw direction string ("UP"/"DOWN", any case).
    pub direction: String,
    /// Stake in coins.
    pub amount: i64,
}

/// Successful admission result returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct BetReceipt {
    /// Market the bet was admitted into.
    pub market_id: i64,
    /// Parsed direction.
    pub direction: Direction,
    /// Stake debited.
    pub amount: i64,
    /// Coins credited if the direction is correct.
    pub potential_payout: i64,
    /// Balance after the debit.
    pub new_balance: i64,
    /// When the market is due to settle.
    pub closes_at: Option<DateTime<Utc>>,
}

/// Admission rejections and internal failures.
///
/// Every rejection carries a stable code shared by all front-ends; only
/// `Ledger` maps to an internal error with no code.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Too many admitted bets inside the sliding window.
    #[error("rate limited: at most {max} bets per {window_seconds}s")]
    RateLimited {
        /// Window capacity.
        max: u32,
        /// Window length.
        window_seconds: u64,
    },

    /// Direction did not parse as UP or DOWN.
    #[error("direction must be UP or DOWN")]
    BadDirection,

    /// Amount outside the configured bounds.
    #[error("amount must be between {min} and {max} coins")]
    BadAmount {
        /// Minimum stake.
        min: i64,
        /// Maximum stake.
        max: i64,
    },

    /// No market is currently open.
    #[error("no active market right now")]
    NoMarket,

    /// Stake exceeds the user's balance.
    #[error("insufficient funds: balance {balance}, bet {amount}")]
    InsufficientFunds {
        /// Current balance.
        balance: i64,
        /// Requested stake.
        amount: i64,
    },

    /// The user already has an unresolved bet on this market.
    #[error("already have a bet on this market")]
    DuplicateBet,

    /// Ledger failure (internal defect, not a rejection).
    #[error(transparent)]
    Ledger(LedgerError),
}

impl AdmissionError {
    /// Stable machine-readable code, `None` for internal failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::RateLimited { .. } => Some("rate_limited"),
            Self::BadDirection => Some("bad_direction"),
            Self::BadAmount { .. } => Some("bad_amount"),
            Self::NoMarket => Some("no_market"),
            Self::InsufficientFunds { .. } => Some("insufficient_funds"),
            Self::DuplicateBet => Some("duplicate_bet"),
            Self::Ledger(_) => None,
        }
    }
}

impl From<LedgerError> for AdmissionError {
    fn from(err: LedgerError) -> Self {
        match err {
            // UNIQUE-constraint backstop for a race the pre-check missed.
            LedgerError::DuplicateBet { .. } => Self::DuplicateBet,
            LedgerError::Overdraw {
                balance, amount, ..
            } => Self::InsufficientFunds { balance, amount },
            other => Self::Ledger(other),
        }
    }
}

/// The canonical bet admission path, shared by every front-end.
pub struct BetAdmission {
    ledger: Arc<Ledger>,
    limiter: Arc<RateLimiter>,
    market: MarketConfig,
    rate_limit: RateLimitConfig,
}

impl BetAdmission {
    /// Wire up the admission path.
    pub fn new(
        ledger: Arc<Ledger>,
        limiter: Arc<RateLimiter>,
        market: MarketConfig,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            ledger,
            limiter,
            market,
            rate_limit,
        }
    }

    /// Validate and place a bet.
    pub async fn place_bet(&self, request: &BetRequest) -> Result<BetReceipt, AdmissionError> {
        // 1. Rate limit — before touching the ledger at all.
        if !self.limiter.check(request.user_id) {
            warn!(user_id = request.user_id, "Bet rejected: rate limited");
            return Err(AdmissionError::RateLimited {
                max: self.rate_limit.max_bets,
                window_seconds: self.rate_limit.window_seconds,
            });
        }

        // 2. Direction.
        let direction =
            Direction::parse(&request.direction).ok_or(AdmissionError::BadDirection)?;

        // 3. Amount bounds.
        if request.amount < self.market.min_bet || request.amount > self.market.max_bet {
            return Err(AdmissionError::BadAmount {
                min: self.market.min_bet,
                max: self.market.max_bet,
            });
        }

        let amount = request.amount;
        let multiplier = self.market.win_multiplier;
        let user_id = request.user_id;
        let username = request.username.clone();

        // 4–6 + debit + insert: one serialized unit of work.
        let admitted = self
            .ledger
            .exclusive(move |tx| {
                tx.ensure_user(user_id, &username)?;

                let Some(market) = tx.open_market()? else {
                    return Ok(Err(AdmissionError::NoMarket));
                };

                let balance = tx.coins(user_id)?.ok_or(LedgerError::UnknownUser(user_id))?;
                if balance < amount {
                    return Ok(Err(AdmissionError::InsufficientFunds { balance, amount }));
                }

                if tx.active_bet(user_id, market.id)?.is_some() {
                    return Ok(Err(AdmissionError::DuplicateBet));
                }

                let new_balance = tx.debit(user_id, amount)?;
                tx.insert_bet(user_id, market.id, direction, amount)?;

                Ok(Ok(BetReceipt {
                    market_id: market.id,
                    direction,
                    amount,
                    potential_payout: amount * multiplier,
                    new_balance,
                    closes_at: market.close_time,
                }))
            })
            .await??;

        info!(
            user_id = request.user_id,
            market_id = admitted.market_id,
            direction = %admitted.direction,
            amount = admitted.amount,
            new_balance = admitted.new_balance,
            "Bet placed"
        );

        Ok(admitted)
    }
}
