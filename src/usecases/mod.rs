//! Use cases: the transport-agnostic core operations.
//!
//! One canonical implementation of each business rule; the HTTP adapter
//! (and any chat front-end) is a thin translation layer over these.

pub mod bet_admission;
pub mod daily_reward;
pub mod leaderboard;
pub mod market_engine;
pub mod rate_limiter;
