//! User account types.

use chrono::NaiveDate;
use serde::Serialize;

/// A persisted user row.
///
/// Created on first interaction, never deleted. `coins` is the
/// authoritative balance and must be ≥ 0 after every transaction.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Opaque numeric identity supplied by the transport.
    pub id: i64,
    /// Display name, refreshed on every interaction.
    pub username: String,
    /// Integer coin balance.
    pub coins: i64,
    /// UTC date of the last daily-reward claim.
    pub last_daily: Option<NaiveDate>,
}

/// A user enriched with derived leaderboard fields, returned by the
/// profile/upsert surface.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// User id.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// Current coin balance.
    pub coins: i64,
    /// Balance minus this week's snapshot balance (0 if no snapshot).
    pub weekly_gain: i64,
    /// 1-based rank by absolute balance.
    pub rank: i64,
}

/// One row of the weekly leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// Display name.
    pub username: String,
    /// Current coin balance.
    pub coins: i64,
    /// Balance minus this week's snapshot balance.
    pub weekly_gain: i64,
}
