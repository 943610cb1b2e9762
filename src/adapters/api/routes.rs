//! HTTP API route definitions.

use axum::Router;
use axum::routing::{get, post};

use super::handlers::{self, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/api/user", post(handlers::upsert_user))
        .route("/api/market", get(handlers::current_market))
        .route("/api/price", get(handlers::current_price))
        .route("/api/bet", post(handlers::place_bet))
        .route("/api/bets/active", get(handlers::active_bet))
        .route("/api/bets/recent", get(handlers::recent_bets))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .route("/api/reward/claim", post(handlers::claim_reward))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::adapters::metrics::MetricsRegistry;
    use crate::adapters::notify::LogNotifier;
    use crate::adapters::persistence::Ledger;
    use crate::config::{MarketConfig, RateLimitConfig, RewardConfig};
    use crate::ports::oracle::PriceOracle;
    use crate::usecases::bet_admission::BetAdmission;
    use crate::usecases::daily_reward::DailyReward;
    use crate::usecases::leaderboard::Leaderboard;
    use crate::usecases::rate_limiter::RateLimiter;

    struct StaticOracle(Option<f64>);

    #[async_trait]
    impl PriceOracle for StaticOracle {
        async fn fetch_price(&self) -> Option<f64> {
            self.0
        }
    }

    fn test_state(price: Option<f64>) -> AppState {
        let ledger = Arc::new(Ledger::in_memory().unwrap());
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig::default()));
        let admission = Arc::new(BetAdmission::new(
            Arc::clone(&ledger),
            limiter,
            MarketConfig::default(),
            RateLimitConfig::default(),
        ));
        let rewards = Arc::new(DailyReward::new(
            Arc::clone(&ledger),
            Arc::new(LogNotifier),
            RewardConfig::default(),
        ));
        let leaderboard = Arc::new(Leaderboard::new(Arc::clone(&ledger)));
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        AppState {
            ledger,
            oracle: Arc::new(StaticOracle(price)),
            admission,
            rewards,
            leaderboard,
            metrics,
        }
    }

    async fn open_market(state: &AppState, open_price: f64) {
        let now = Utc::now();
        state
            .ledger
            .exclusive(move |tx| {
                tx.insert_open_market(open_price, now, now + chrono::Duration::minutes(5))
            })
            .await
            .unwrap();
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint_returns_ok() {
        let app = create_router(test_state(Some(50_000.0)));
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_market_returns_404_when_none_open() {
        let app = create_router(test_state(Some(50_000.0)));
        let response = app.oneshot(get("/api/market")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "no_market");
    }

    #[tokio::test]
    async fn test_price_unavailable_maps_to_502() {
        let app = create_router(test_state(None));
        let response = app.oneshot(get("/api/price")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "price_unavailable");
    }

    #[tokio::test]
    async fn test_price_includes_change_against_open_market() {
        let state = test_state(Some(50_500.0));
        open_market(&state, 50_000.0).await;
        let app = create_router(state);

        let response = app.oneshot(get("/api/price")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!((body["price"].as_f64().unwrap() - 50_500.0).abs() < f64::EPSILON);
        assert!((body["change"].as_f64().unwrap() - 500.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_bet_with_bad_direction_is_400() {
        let state = test_state(Some(50_000.0));
        open_market(&state, 50_000.0).await;
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                "/api/bet",
                json!({"user_id": 1, "username": "alice", "direction": "SIDEWAYS", "amount": 50}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_direction");
    }

    #[tokio::test]
    async fn test_bet_without_market_is_409() {
        let app = create_router(test_state(Some(50_000.0)));

        let response = app
            .oneshot(post_json(
                "/api/bet",
                json!({"user_id": 1, "username": "alice", "direction": "UP", "amount": 50}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"], "no_market");
    }

    #[tokio::test]
    async fn test_bet_flow_claim_place_duplicate() {
        let state = test_state(Some(50_000.0));
        open_market(&state, 50_000.0).await;
        let app = create_router(state);

        // Fund the user via the daily reward.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/reward/claim",
                json!({"user_id": 7, "username": "alice"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "granted");
        assert_eq!(body["new_balance"], 100);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/bet",
                json!({"user_id": 7, "username": "alice", "direction": "up", "amount": 60}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["new_balance"], 40);
        assert_eq!(body["potential_payout"], 120);

        // A second bet on the same market is rejected.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/bet",
                json!({"user_id": 7, "username": "alice", "direction": "down", "amount": 10}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "duplicate_bet");

        // The active bet shows up for the user.
        let response = app
            .oneshot(get("/api/bets/active?user_id=7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["bet"]["amount"], 60);
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_409() {
        let state = test_state(Some(50_000.0));
        open_market(&state, 50_000.0).await;
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                "/api/bet",
                json!({"user_id": 1, "username": "broke", "direction": "UP", "amount": 50}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"], "insufficient_funds");
    }

    #[tokio::test]
    async fn test_second_claim_same_day_is_already_claimed() {
        let app = create_router(test_state(Some(50_000.0)));
        let claim = json!({"user_id": 3, "username": "bob"});

        let response = app
            .clone()
            .oneshot(post_json("/api/reward/claim", claim.clone()))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["status"], "granted");

        let response = app
            .oneshot(post_json("/api/reward/claim", claim))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "already_claimed");
        assert!(body.get("new_balance").is_none());
    }

    #[tokio::test]
    async fn test_leaderboard_shape() {
        let app = create_router(test_state(Some(50_000.0)));
        let response = app.oneshot(get("/api/leaderboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["entries"].as_array().unwrap().is_empty());
        assert!(body["week_start"].is_string());
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let app = create_router(test_state(Some(50_000.0)));
        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("coinpredict_"));
    }
}
