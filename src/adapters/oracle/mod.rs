//! Price Oracle Adapters
//!
//! HTTP price sources behind the `PriceOracle` port. CoinGecko is the
//! only source today; the port keeps the engine unaware of where the
//! price comes from.

pub mod coingecko;

pub use coingecko::CoinGeckoOracle;
