//! CoinPredict — Entry Point
//!
//! Initializes configuration, logging, the SQLite ledger, and the
//! clock-driven settlement engine. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open the ledger (SQLite, WAL)
//! 4. Create the CoinGecko oracle and the rate limiter
//! 5. Wire the usecases (admission, rewards, leaderboard, engine)
//! 6. Startup repair: ensure a market is open, refresh the snapshot
//! 7. Spawn the settlement loop and the housekeeping loop
//! 8. Serve the HTTP API + /metrics on the configured address
//! 9. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::api::{self, AppState};
use adapters::metrics::MetricsRegistry;
use adapters::notify::LogNotifier;
use adapters::oracle::CoinGeckoOracle;
use adapters::persistence::Ledger;
use usecases::bet_admission::BetAdmission;
use usecases::daily_reward::DailyReward;
use usecases::leaderboard::Leaderboard;
use usecases::market_engine::{MarketEngine, TickResult};
use usecases::rate_limiter::RateLimiter;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        interval_minutes = config.market.interval_minutes,
        "Starting CoinPredict"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Open the shared ledger ───────────────────────────
    let ledger = Arc::new(
        Ledger::open(&config.persistence.db_path).context("Failed to open the ledger")?,
    );

    // ── 5. Oracle, limiter, metrics ─────────────────────────
    let oracle = Arc::new(
        CoinGeckoOracle::new(&config.oracle).context("Failed to build the price oracle")?,
    );
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

    // ── 6. Wire the usecases ────────────────────────────────
    let admission = Arc::new(BetAdmission::new(
        Arc::clone(&ledger),
        Arc::clone(&limiter),
        config.market.clone(),
        config.rate_limit.clone(),
    ));
    let rewards = Arc::new(DailyReward::new(
        Arc::clone(&ledger),
        Arc::new(LogNotifier),
        config.reward.clone(),
    ));
    let leaderboard = Arc::new(Leaderboard::new(Arc::clone(&ledger)));
    let engine = Arc::new(MarketEngine::new(
        Arc::clone(&ledger),
        Arc::clone(&oracle),
        config.market.clone(),
    ));

    // ── 7. Startup repair ───────────────────────────────────
    // An oracle outage here is fine: the settlement loop retries.
    engine
        .ensure_open_market()
        .await
        .context("Startup market check failed")?;
    leaderboard
        .rollover_if_due()
        .await
        .context("Startup snapshot check failed")?;

    // ── 8. Settlement loop ──────────────────────────────────
    let settlement_handle = tokio::spawn(run_settlement_loop(
        Arc::clone(&engine),
        Arc::clone(&metrics),
        config.market.interval_minutes,
        shutdown_tx.subscribe(),
    ));

    // ── 9. Housekeeping loop (snapshot rollover + limiter) ──
    let housekeeping_handle = tokio::spawn(run_housekeeping_loop(
        Arc::clone(&leaderboard),
        Arc::clone(&limiter),
        shutdown_tx.subscribe(),
    ));

    // ── 10. HTTP API + /metrics ─────────────────────────────
    let state = AppState {
        ledger,
        oracle,
        admission,
        rewards,
        leaderboard,
        metrics,
    };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.service.bind_address)
        .await
        .context("Failed to bind the API address")?;
    info!(address = %config.service.bind_address, "API server started");

    let mut api_shutdown = shutdown_tx.subscribe();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = api_shutdown.recv().await;
            })
            .await
        {
            error!(error = %e, "API server failed");
        }
    });

    info!("All tasks spawned — service is running");

    // ── 11. Wait for SIGINT ─────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // In-flight ledger units of work finish on their own; just give the
    // loops a moment to observe the signal.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), settlement_handle).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), housekeeping_handle).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), api_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Close, pay out, and reopen on every interval tick.
async fn run_settlement_loop(
    engine: Arc<MarketEngine<CoinGeckoOracle>>,
    metrics: Arc<MetricsRegistry>,
    interval_minutes: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let period = std::time::Duration::from_secs(interval_minutes * 60);
    let mut ticker = tokio::time::interval(period);
    // The first interval tick fires immediately; startup already ensured
    // an open market, so consume it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.settlement_tick().await {
                    Ok(TickResult::Settled(summary)) => {
                        metrics
                            .markets_settled
                            .with_label_values(&[summary.outcome.label()])
                            .inc();
                        metrics
                            .coins_paid
                            .inc_by(u64::try_from(summary.coins_paid).unwrap_or(0));
                        #[allow(clippy::cast_possible_truncation)]
                        metrics.last_price_usd.set(summary.close_price as i64);
                    }
                    Ok(TickResult::Opened(_)) => {}
                    Ok(TickResult::PriceUnavailable) => {
                        metrics.oracle_failures.inc();
                    }
                    Err(e) => {
                        error!(error = %e, "Settlement tick failed; retrying next tick");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Settlement loop shutting down");
                return;
            }
        }
    }
}

/// Weekly snapshot rollover check and limiter housekeeping, once a minute.
async fn run_housekeeping_loop(
    leaderboard: Arc<Leaderboard>,
    limiter: Arc<RateLimiter>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = leaderboard.rollover_if_due().await {
                    error!(error = %e, "Snapshot rollover failed; retrying next check");
                }
                limiter.cleanup();
            }
            _ = shutdown_rx.recv() => {
                info!("Housekeeping loop shutting down");
                return;
            }
        }
    }
}
