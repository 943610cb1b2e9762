//! Bet types: direction and the persisted bet row.

use serde::{Deserialize, Serialize};

/// Predicted price direction for a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Close price above open price.
    Up,
    /// Close price below open price.
    Down,
}

impl Direction {
    /// Parse a raw direction string from a transport front-end.
    ///
    /// Case-insensitive; anything other than UP/DOWN is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            _ => None,
        }
    }

    /// Canonical wire/storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted bet row.
///
/// Created by bet admission with the stake already debited; mutated only
/// by settlement (resolved flip + payout credit), never deleted or amended.
#[derive(Debug, Clone, Serialize)]
pub struct Bet {
    /// Sequential bet id.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Target market.
    pub market_id: i64,
    /// Predicted direction.
    pub direction: Direction,
    /// Stake in coins (positive integer).
    pub amount: i64,
    /// Whether settlement has processed this bet.
    pub resolved: bool,
}

/// A historical bet joined with its market for the recent-bets query.
#[derive(Debug, Clone, Serialize)]
pub struct BetHistoryEntry {
    /// Sequential bet id.
    pub id: i64,
    /// Target market.
    pub market_id: i64,
    /// Predicted direction.
    pub direction: Direction,
    /// Stake in coins.
    pub amount: i64,
    /// Whether settlement has processed this bet.
    pub resolved: bool,
    /// Market open price.
    pub open_price: f64,
    /// Market close price (None while the market is still open).
    pub close_price: Option<f64>,
    /// True only for resolved bets that matched the winning direction.
    pub won: bool,
}
