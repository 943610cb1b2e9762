//! HTTP API handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::adapters::metrics::MetricsRegistry;
use crate::adapters::persistence::{Ledger, LedgerError};
use crate::domain::bet::{Bet, BetHistoryEntry};
use crate::ports::oracle::PriceOracle;
use crate::usecases::bet_admission::{AdmissionError, BetAdmission, BetRequest};
use crate::usecases::daily_reward::{ClaimEvent, ClaimOutcome, DailyReward};
use crate::usecases::leaderboard::Leaderboard;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared ledger store (read-only queries).
    pub ledger: Arc<Ledger>,
    /// Price oracle, proxied by /api/price.
    pub oracle: Arc<dyn PriceOracle>,
    /// The canonical bet admission path.
    pub admission: Arc<BetAdmission>,
    /// The daily reward grant path.
    pub rewards: Arc<DailyReward>,
    /// Leaderboard queries and profiles.
    pub leaderboard: Arc<Leaderboard>,
    /// Prometheus metrics.
    pub metrics: Arc<MetricsRegistry>,
}

/// Stable-code error body shared by all rejection responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub error: &'static str,
    /// Human-readable detail.
    pub message: String,
}

fn reject(status: StatusCode, error: &'static str, message: String) -> Response {
    (status, Json(ErrorBody { error, message })).into_response()
}

fn internal(err: &LedgerError) -> Response {
    error!(error = %err, "Ledger failure while serving a request");
    reject(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "internal error".to_string(),
    )
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "coinpredict",
    })
}

/// User upsert request.
#[derive(Debug, Deserialize)]
pub struct UpsertUserBody {
    /// Opaque numeric user id.
    pub user_id: i64,
    /// Display name.
    pub username: String,
}

/// Upsert a user and return the profile (balance, weekly gain, rank).
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(body): Json<UpsertUserBody>,
) -> Response {
    match state.leaderboard.profile(body.user_id, &body.username).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => internal(&e),
    }
}

/// Current open market, 404 when none is open.
pub async fn current_market(State(state): State<AppState>) -> Response {
    match state.ledger.exclusive(|tx| tx.open_market()).await {
        Ok(Some(market)) => Json(market).into_response(),
        Ok(None) => reject(
            StatusCode::NOT_FOUND,
            "no_market",
            "no active market right now".to_string(),
        ),
        Err(e) => internal(&e),
    }
}

/// Direct price query response.
#[derive(Debug, Serialize)]
pub struct PriceResponse {
    /// Current BTC/USD price.
    pub price: f64,
    /// Change versus the open market's open price, when one is open.
    pub change: Option<f64>,
}

/// Current BTC/USD price, 502 retryable when the oracle has nothing.
pub async fn current_price(State(state): State<AppState>) -> Response {
    let Some(price) = state.oracle.fetch_price().await else {
        state.metrics.oracle_failures.inc();
        return reject(
            StatusCode::BAD_GATEWAY,
            "price_unavailable",
            "price unavailable, try again".to_string(),
        );
    };
    #[allow(clippy::cast_possible_truncation)]
    state.metrics.last_price_usd.set(price as i64);

    let change = match state.ledger.exclusive(|tx| tx.open_market()).await {
        Ok(market) => market.map(|m| price - m.open_price),
        Err(e) => return internal(&e),
    };

    Json(PriceResponse { price, change }).into_response()
}

/// Bet placement request.
#[derive(Debug, Deserialize)]
pub struct PlaceBetBody {
    /// User placing the bet.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// "UP" or "DOWN", any case.
    pub direction: String,
    /// Stake in coins.
    pub amount: i64,
}

/// Successful bet response.
#[derive(Debug, Serialize)]
pub struct BetResponse {
    /// Always true on success.
    pub ok: bool,
    /// The admission receipt.
    #[serde(flatten)]
    pub receipt: crate::usecases::bet_admission::BetReceipt,
}

/// Place a bet through the shared admission path.
pub async fn place_bet(
    State(state): State<AppState>,
    Json(body): Json<PlaceBetBody>,
) -> Response {
    let request = BetRequest {
        user_id: body.user_id,
        username: body.username,
        direction: body.direction,
        amount: body.amount,
    };

    match state.admission.place_bet(&request).await {
        Ok(receipt) => {
            state
                .metrics
                .bets_placed
                .with_label_values(&[receipt.direction.as_str()])
                .inc();
            Json(BetResponse { ok: true, receipt }).into_response()
        }
        Err(AdmissionError::Ledger(inner)) => internal(&inner),
        Err(err) => {
            let code = err.code().unwrap_or("internal");
            state.metrics.bets_rejected.with_label_values(&[code]).inc();

            let status = match &err {
                AdmissionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                AdmissionError::BadDirection | AdmissionError::BadAmount { .. } => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::CONFLICT,
            };
            reject(status, code, err.to_string())
        }
    }
}

/// Query string carrying the acting user.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// Acting user id.
    pub user_id: i64,
}

/// Active bet response.
#[derive(Debug, Serialize)]
pub struct ActiveBetResponse {
    /// The unresolved bet in the open market, if any.
    pub bet: Option<Bet>,
}

/// The user's unresolved bet in the currently open market.
pub async fn active_bet(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Response {
    let user_id = query.user_id;
    let result = state
        .ledger
        .exclusive(move |tx| {
            let Some(market) = tx.open_market()? else {
                return Ok(None);
            };
            tx.active_bet(user_id, market.id)
        })
        .await;

    match result {
        Ok(bet) => Json(ActiveBetResponse { bet }).into_response(),
        Err(e) => internal(&e),
    }
}

/// How many history rows /api/bets/recent returns.
const RECENT_BETS: i64 = 10;

/// Recent bets response.
#[derive(Debug, Serialize)]
pub struct RecentBetsResponse {
    /// Newest first, max 10.
    pub bets: Vec<BetHistoryEntry>,
}

/// The user's last bets with win/loss flags.
pub async fn recent_bets(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Response {
    let user_id = query.user_id;
    let result = state
        .ledger
        .exclusive(move |tx| tx.recent_bets(user_id, RECENT_BETS))
        .await;

    match result {
        Ok(bets) => Json(RecentBetsResponse { bets }).into_response(),
        Err(e) => internal(&e),
    }
}

/// Top-10 weekly leaderboard.
pub async fn leaderboard(State(state): State<AppState>) -> Response {
    match state.leaderboard.top().await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal(&e),
    }
}

/// Reward claim request.
#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    /// Claiming user.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Content the claim referenced, if any.
    #[serde(default)]
    pub message_id: Option<i64>,
}

/// Reward claim response.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    /// "granted", "already_claimed", or "ignored".
    pub status: &'static str,
    /// Coins granted, present only on a grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Balance after the grant, present only on a grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
}

/// Claim the daily reward. Repeated same-day claims are quiet no-ops.
pub async fn claim_reward(
    State(state): State<AppState>,
    Json(body): Json<ClaimBody>,
) -> Response {
    let event = ClaimEvent {
        user_id: body.user_id,
        username: body.username,
        message_id: body.message_id,
    };

    match state.rewards.claim(&event).await {
        Ok(ClaimOutcome::Granted {
            amount,
            new_balance,
        }) => {
            state.metrics.reward_claims.inc();
            Json(ClaimResponse {
                status: "granted",
                amount: Some(amount),
                new_balance: Some(new_balance),
            })
            .into_response()
        }
        Ok(ClaimOutcome::AlreadyClaimed) => Json(ClaimResponse {
            status: "already_claimed",
            amount: None,
            new_balance: None,
        })
        .into_response(),
        Ok(ClaimOutcome::Filtered) => Json(ClaimResponse {
            status: "ignored",
            amount: None,
            new_balance: None,
        })
        .into_response(),
        Err(e) => internal(&e),
    }
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather(),
    )
        .into_response()
}
