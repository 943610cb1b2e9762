//! Leaderboard & Weekly Snapshot
//!
//! The leaderboard ranks users by gain since the most recent Monday
//! 00:00 UTC. Balances never reset; the rollover replaces the snapshot
//! set wholesale so gains always measure from the current week only.
//! The rollover is edge-triggered: a periodic check compares the stored
//! snapshot week with the computed current week, which self-heals across
//! restarts that straddle a Monday.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::adapters::persistence::{Ledger, LedgerError};
use crate::domain::user::{LeaderboardEntry, UserProfile};
use crate::domain::week;

/// How many rows the leaderboard surface returns.
const LEADERBOARD_SIZE: i64 = 10;

/// The ranked weekly view.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardView {
    /// Monday the gains are measured from.
    pub week_start: NaiveDate,
    /// Top users by (weekly gain desc, balance desc), max 10.
    pub entries: Vec<LeaderboardEntry>,
}

/// Leaderboard queries and the weekly snapshot rollover.
pub struct Leaderboard {
    ledger: Arc<Ledger>,
}

impl Leaderboard {
    /// Wire up the leaderboard.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// The top-10 weekly view.
    pub async fn top(&self) -> Result<LeaderboardView, LedgerError> {
        let week_start = week::current_week_start();
        let entries = self
            .ledger
            .exclusive(move |tx| tx.leaderboard(week_start, LEADERBOARD_SIZE))
            .await?;
        Ok(LeaderboardView {
            week_start,
            entries,
        })
    }

    /// Upsert a user and return the profile with derived fields.
    pub async fn profile(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<UserProfile, LedgerError> {
        let week_start = week::current_week_start();
        let username = username.to_string();
        self.ledger
            .exclusive(move |tx| {
                tx.ensure_user(user_id, &username)?;
                let user = tx.user(user_id)?.ok_or(LedgerError::UnknownUser(user_id))?;
                Ok(UserProfile {
                    id: user.id,
                    username: user.username,
                    coins: user.coins,
                    weekly_gain: tx.weekly_gain(user_id, week_start)?,
                    rank: tx.rank(user_id)?,
                })
            })
            .await
    }

    /// Replace the snapshot set when the week has rolled over.
    ///
    /// Returns the new week start when a rollover happened. A missing
    /// snapshot (fresh database) is also refreshed so the first capture
    /// is not deferred a full week.
    pub async fn rollover_if_due(&self) -> Result<Option<NaiveDate>, LedgerError> {
        let current = week::current_week_start();
        let rolled = self
            .ledger
            .exclusive(move |tx| {
                let stored = tx.snapshot_week()?;
                if stored == Some(current) {
                    return Ok(None);
                }
                let captured = tx.replace_weekly_snapshot(current)?;
                if captured == 0 && stored.is_none() {
                    // Fresh database with no users yet; nothing to tag.
                    return Ok(None);
                }
                Ok(Some(captured))
            })
            .await?;

        if let Some(captured) = rolled {
            info!(
                week_start = %current,
                users = captured,
                "Weekly leaderboard snapshot refreshed"
            );
            return Ok(Some(current));
        }
        Ok(None)
    }
}
