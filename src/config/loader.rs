//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        interval_minutes = config.market.interval_minutes,
        win_multiplier = config.market.win_multiplier,
        daily_reward = config.reward.daily_amount,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    anyhow::ensure!(
        config.market.interval_minutes >= 1,
        "market.interval_minutes must be at least 1, got {}",
        config.market.interval_minutes
    );
    anyhow::ensure!(
        config.market.tie_epsilon > 0.0,
        "market.tie_epsilon must be positive, got {}",
        config.market.tie_epsilon
    );
    anyhow::ensure!(
        config.market.win_multiplier >= 1,
        "market.win_multiplier must be at least 1, got {}",
        config.market.win_multiplier
    );
    anyhow::ensure!(
        config.market.min_bet >= 1,
        "market.min_bet must be at least 1, got {}",
        config.market.min_bet
    );
    anyhow::ensure!(
        config.market.max_bet >= config.market.min_bet,
        "market.max_bet ({}) must be >= market.min_bet ({})",
        config.market.max_bet,
        config.market.min_bet
    );
    anyhow::ensure!(
        config.reward.daily_amount > 0,
        "reward.daily_amount must be positive, got {}",
        config.reward.daily_amount
    );
    anyhow::ensure!(
        config.rate_limit.max_bets > 0,
        "rate_limit.max_bets must be positive"
    );
    anyhow::ensure!(
        config.rate_limit.window_seconds > 0,
        "rate_limit.window_seconds must be positive"
    );
    anyhow::ensure!(!config.oracle.url.is_empty(), "oracle.url must not be empty");
    anyhow::ensure!(
        config.oracle.timeout_seconds > 0,
        "oracle.timeout_seconds must be positive"
    );
    anyhow::ensure!(
        !config.persistence.db_path.is_empty(),
        "persistence.db_path must not be empty"
    );

    Ok(())
}
