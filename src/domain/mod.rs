//! Core domain types and settlement arithmetic.
//!
//! Pure business logic with no I/O: bet directions, market lifecycle,
//! payout computation, and calendar helpers. The inner ring of the
//! hexagonal architecture — everything here is synchronous and
//! deterministic, which keeps the settlement invariants unit-testable.

pub mod bet;
pub mod market;
pub mod settlement;
pub mod user;
pub mod week;
