//! Reward Notifier Adapters
//!
//! Outbound delivery of reward confirmations. The HTTP front-end has no
//! push channel, so its notifier just logs; a chat front-end would plug
//! its own delivery in behind the same port.

use async_trait::async_trait;
use tracing::info;

use crate::ports::notifier::{RewardNote, RewardNotifier};

/// Notifier that records the confirmation in the log and nothing else.
pub struct LogNotifier;

#[async_trait]
impl RewardNotifier for LogNotifier {
    async fn notify(&self, user_id: i64, note: &RewardNote) -> anyhow::Result<()> {
        info!(
            user_id,
            amount = note.amount,
            new_balance = note.new_balance,
            "Reward confirmation"
        );
        Ok(())
    }
}
