//! Market lifecycle types.
//!
//! A market is one settlement window: it opens at a fetched price, carries
//! a close deadline, and is closed exactly once by the settlement tick.
//! Exactly one market is OPEN at any time; the ledger enforces this.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Accepting bets; awaiting the settlement tick.
    Open,
    /// Settled; close price recorded, bets resolved.
    Closed,
}

impl MarketStatus {
    /// Canonical storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    /// Parse the storage form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// A persisted market row.
#[derive(Debug, Clone, Serialize)]
pub struct Market {
    /// Sequential market id.
    pub id: i64,
    /// Price at window open.
    pub open_price: f64,
    /// Price at settlement; None while the market is open.
    pub close_price: Option<f64>,
    /// When the window opened.
    pub open_time: DateTime<Utc>,
    /// Close deadline while open; actual close time once settled.
    pub close_time: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: MarketStatus,
}
