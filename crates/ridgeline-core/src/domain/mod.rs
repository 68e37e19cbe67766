//! # Domain Models
//!
//! Canonical domain types for ridgeline price data.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Instrument`] | Watchlist entry with its ordered candidate symbols |
//! | [`CandidateSymbol`] | (provider, spelling) pair tried during resolution |
//! | [`Bar`] | One trading day of OHLC data, optional volume |
//! | [`PriceSeries`] | Ascending, date-unique bars for one resolved symbol |
//! | [`Provenance`] | Which candidate actually produced a series |
//! | [`Window`] | Trailing range of daily bars (6mo, 1y, 2y) |
//! | [`CostBasis`] | User-supplied average price; non-positive means no position |
//!
//! Construction validates invariants, so a [`Bar`] with `high < low` or an
//! [`Instrument`] without candidates cannot exist.

mod models;
mod symbol;
mod timestamp;
mod window;

pub use models::{Bar, CostBasis, Currency, Instrument, KrxBoard, PriceSeries, Provenance};
pub use symbol::{CandidateSymbol, Symbol};
pub use timestamp::{TradingDate, UtcDateTime};
pub use window::Window;
