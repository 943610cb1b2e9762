//! HTTP API Front-end
//!
//! Thin axum translation layer over the usecases: parse the request,
//! call the shared admission/reward/leaderboard paths, map the outcome
//! to a status code and JSON body. No business rule lives here — the
//! chat front-end calls the very same usecases.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
