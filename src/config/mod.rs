//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Every knob the
//! game exposes (market interval, tie epsilon, bet bounds, reward size,
//! rate limits, oracle endpoint) is externalized here — nothing is
//! hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup and validated before any task
/// spawns. Every section carries production defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Service identity, logging, and bind address.
    pub service: ServiceConfig,
    /// Market window and settlement parameters.
    pub market: MarketConfig,
    /// Daily reward parameters.
    pub reward: RewardConfig,
    /// Per-user bet admission rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Price oracle endpoint.
    pub oracle: OracleConfig,
    /// Ledger persistence.
    pub persistence: PersistenceConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Human-readable service name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// HTTP API bind address.
    pub bind_address: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "coinpredict".to_string(),
            log_level: "info".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Market window and settlement configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Settlement window length in minutes.
    pub interval_minutes: u64,
    /// Absolute price tolerance for a tie, in price units.
    ///
    /// Deliberately a fixed epsilon rather than a percentage.
    pub tie_epsilon: f64,
    /// Payout multiplier for a correct bet.
    pub win_multiplier: i64,
    /// Minimum stake per bet.
    pub min_bet: i64,
    /// Maximum stake per bet (anti-whale cap).
    pub max_bet: i64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            tie_epsilon: 0.01,
            win_multiplier: 2,
            min_bet: 1,
            max_bet: 10_000,
        }
    }
}

/// Daily reward configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Coins granted per daily claim.
    pub daily_amount: i64,
    /// Only reward claims referencing this post, when set.
    pub reward_message_id: Option<i64>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            daily_amount: 100,
            reward_message_id: None,
        }
    }
}

/// Bet admission rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted bets per user per window.
    pub max_bets: u32,
    /// Sliding window length in seconds.
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_bets: 3,
            window_seconds: 60,
        }
    }
}

/// Price oracle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Price endpoint URL.
    pub url: String,
    /// Request timeout in seconds. One attempt, no retries.
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd"
                .to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Ledger persistence configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// SQLite database path, shared by all front-ends.
    pub db_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: "coinpredict.db".to_string(),
        }
    }
}
