//! Reward Notifier Port - Best-effort Outbound Notification
//!
//! After a daily reward commits, the user is told out-of-band (chat DM,
//! push, nothing at all). Delivery is best-effort by contract: the coin
//! grant is already authoritative, so a failed notification is logged
//! and swallowed, never rolled back or retried.

use async_trait::async_trait;

/// Payload for a granted-reward notification.
#[derive(Debug, Clone)]
pub struct RewardNote {
    /// Coins granted.
    pub amount: i64,
    /// Balance after the grant.
    pub new_balance: i64,
}

/// Trait for outbound reward notifications.
#[async_trait]
pub trait RewardNotifier: Send + Sync + 'static {
    /// Deliver a notification to the user. Errors are advisory only.
    async fn notify(&self, user_id: i64, note: &RewardNote) -> anyhow::Result<()>;
}
