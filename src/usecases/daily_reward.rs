//! Daily Reward - Once-per-day Bonus Grant
//!
//! Triggered by an external claim event (a reaction in the chat
//! front-end, a POST on the HTTP one). Idempotency key is the UTC
//! calendar date: repeated triggers on the same day are silent no-ops,
//! not errors — that is expected noise. The outbound notification runs
//! only after the grant commits and is strictly best-effort.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::adapters::persistence::{Ledger, LedgerError};
use crate::config::RewardConfig;
use crate::ports::notifier::{RewardNote, RewardNotifier};

/// An external claim event.
#[derive(Debug, Clone)]
pub struct ClaimEvent {
    /// Claiming user.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Content the claim referenced (reaction target), if any.
    pub message_id: Option<i64>,
}

/// What a claim attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Coins granted.
    Granted {
        /// Coins granted.
        amount: i64,
        /// Balance after the grant.
        new_balance: i64,
    },
    /// Already claimed today; nothing changed.
    AlreadyClaimed,
    /// Event did not reference the configured reward post; ignored.
    Filtered,
}

/// The daily reward grant path.
pub struct DailyReward {
    ledger: Arc<Ledger>,
    notifier: Arc<dyn RewardNotifier>,
    config: RewardConfig,
}

impl DailyReward {
    /// Wire up the reward path.
    pub fn new(
        ledger: Arc<Ledger>,
        notifier: Arc<dyn RewardNotifier>,
        config: RewardConfig,
    ) -> Self {
        Self {
            ledger,
            notifier,
            config,
        }
    }

    /// Process a claim event for today (UTC).
    pub async fn claim(&self, event: &ClaimEvent) -> Result<ClaimOutcome, LedgerError> {
        self.claim_on(event, Utc::now().date_naive()).await
    }

    /// Deterministic core: process a claim event for a given day.
    pub async fn claim_on(
        &self,
        event: &ClaimEvent,
        today: NaiveDate,
    ) -> Result<ClaimOutcome, LedgerError> {
        // Only reward reactions to the configured reference post.
        if let Some(required) = self.config.reward_message_id {
            if event.message_id != Some(required) {
                return Ok(ClaimOutcome::Filtered);
            }
        }

        let user_id = event.user_id;
        let username = event.username.clone();
        let amount = self.config.daily_amount;

        let outcome = self
            .ledger
            .exclusive(move |tx| {
                tx.ensure_user(user_id, &username)?;

                let user = tx.user(user_id)?.ok_or(LedgerError::UnknownUser(user_id))?;
                if user.last_daily == Some(today) {
                    return Ok(ClaimOutcome::AlreadyClaimed);
                }

                tx.credit(user_id, amount)?;
                tx.set_last_daily(user_id, today)?;
                let new_balance = tx.coins(user_id)?.ok_or(LedgerError::UnknownUser(user_id))?;

                Ok(ClaimOutcome::Granted {
                    amount,
                    new_balance,
                })
            })
            .await?;

        if let ClaimOutcome::Granted {
            amount,
            new_balance,
        } = outcome
        {
            info!(
                user_id = event.user_id,
                amount, new_balance, "Daily reward granted"
            );

            // The grant is committed and authoritative; delivery failures
            // are swallowed.
            let note = RewardNote {
                amount,
                new_balance,
            };
            if let Err(e) = self.notifier.notify(event.user_id, &note).await {
                debug!(
                    user_id = event.user_id,
                    error = %e,
                    "Reward notification failed (non-fatal)"
                );
            }
        }

        Ok(outcome)
    }
}
