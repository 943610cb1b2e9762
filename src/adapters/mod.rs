//! Adapters Layer - External World Integrations
//!
//! Implements the ports against real infrastructure: SQLite ledger,
//! CoinGecko HTTP oracle, Prometheus metrics, and the axum API
//! front-end.

pub mod api;
pub mod metrics;
pub mod notify;
pub mod oracle;
pub mod persistence;
