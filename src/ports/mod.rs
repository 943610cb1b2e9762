//! Ports: traits that isolate the core from external services.
//!
//! The price oracle and the reward notifier are the only true external
//! dependencies; everything else (ledger, rate limiter) lives in-process.
//! Transports and tests supply their own implementations.

pub mod notifier;
pub mod oracle;
