//! Rate Limiter - Per-user Sliding-window Admission Control
//!
//! At most N admitted actions per user per rolling W-second window.
//! Purely in-memory and process-local: a restart resets all state. Uses
//! its own `parking_lot` mutex so admission checks are never slowed by
//! ledger contention — this is checked before any ledger access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::RateLimitConfig;

/// Sliding-window rate limiter keyed by user id.
pub struct RateLimiter {
    max_actions: usize,
    window: Duration,
    buckets: Mutex<HashMap<i64, Vec<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_actions: config.max_bets as usize,
            window: Duration::from_secs(config.window_seconds),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Attempt an action now. `true` = admitted (and recorded).
    pub fn check(&self, user_id: i64) -> bool {
        self.check_at(user_id, Instant::now())
    }

    /// Deterministic core: prune entries older than `now − window`; if
    /// the remaining count has reached the limit, reject; otherwise
    /// record `now` and admit.
    pub fn check_at(&self, user_id: i64, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(user_id).or_default();
        bucket.retain(|t| now.duration_since(*t) < self.window);
        if bucket.len() >= self.max_actions {
            return false;
        }
        bucket.push(now);
        true
    }

    /// Drop users whose whole window has expired (periodic housekeeping).
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        buckets.retain(|_, bucket| {
            bucket.retain(|t| now.duration_since(*t) < self.window);
            !bucket.is_empty()
        });
    }
}
