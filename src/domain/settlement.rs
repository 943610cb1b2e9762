//! Settlement arithmetic: outcome classification and payout computation.
//!
//! Pure functions, fully deterministic. The market engine feeds these with
//! rows loaded under the ledger lock and applies the returned credits; the
//! split keeps the money math property-testable without a database.

use serde::Serialize;

use super::bet::{Bet, Direction};

/// Result of comparing a market's close price against its open price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Outcome {
    /// Close within the tie epsilon of open: every stake is refunded.
    Tie,
    /// Close moved beyond the epsilon: this direction wins.
    Winner(Direction),
}

impl Outcome {
    /// Short label for logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Tie => "tie",
            Self::Winner(Direction::Up) => "up",
            Self::Winner(Direction::Down) => "down",
        }
    }
}

/// Classify a settled market.
///
/// `epsilon` is a fixed absolute tolerance in price units (not a
/// percentage). Within it the market is a tie regardless of sign.
pub fn outcome(open_price: f64, close_price: f64, epsilon: f64) -> Outcome {
    if (close_price - open_price).abs() < epsilon {
        Outcome::Tie
    } else if close_price > open_price {
        Outcome::Winner(Direction::Up)
    } else {
        Outcome::Winner(Direction::Down)
    }
}

/// A single credit owed to a bettor by settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    /// User to credit.
    pub user_id: i64,
    /// Bet the credit stems from.
    pub bet_id: i64,
    /// Coins to credit. Tie: the stake back; win: stake × multiplier.
    pub amount: i64,
}

/// Compute the credits for a settled market.
///
/// - Tie: every bettor gets exactly their stake back (a reversal, not a
///   payout).
/// - Win/loss: bets matching the winning direction get
///   `amount × multiplier`; losing bets get nothing — their stake was
///   already debited at admission.
///
/// Losing bets simply produce no entry; the caller still marks every bet
/// resolved.
pub fn payouts(bets: &[Bet], outcome: Outcome, multiplier: i64) -> Vec<Payout> {
    bets.iter()
        .filter_map(|bet| {
            let amount = match outcome {
                Outcome::Tie => bet.amount,
                Outcome::Winner(direction) if bet.direction == direction => {
                    bet.amount * multiplier
                }
                Outcome::Winner(_) => return None,
            };
            Some(Payout {
                user_id: bet.user_id,
                bet_id: bet.id,
                amount,
            })
        })
        .collect()
}
