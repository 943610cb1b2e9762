//! Persistence adapter: the SQLite-backed ledger store.

pub mod ledger;

pub use ledger::{Ledger, LedgerError, LedgerTx};
