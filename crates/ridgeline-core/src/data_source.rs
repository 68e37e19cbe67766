//! Provider adapter contract and its request/error types.
//!
//! Every upstream vendor is wrapped by one [`PriceSource`]. An adapter either
//! returns a populated [`PriceSeries`] or a [`SourceError`]; whatever goes
//! wrong upstream (transport, status, payload shape, too few bars) is folded
//! into the error so the orchestrator sees a single uniform outcome.
//!
//! # Example
//!
//! ```no_run
//! use ridgeline_core::{PriceSource, SeriesRequest, Symbol, Window, YahooAdapter};
//!
//! async fn fetch(adapter: &YahooAdapter) -> Result<(), Box<dyn std::error::Error>> {
//!     let request = SeriesRequest::new(Symbol::parse("GOOGL")?, Window::OneYear);
//!     match adapter.daily_series(request).await {
//!         Ok(series) => println!("{} bars", series.len()),
//!         Err(error) => println!("unavailable: {error}"),
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{PriceSeries, ProviderId, Symbol, TradingDate, Window};

/// Health state reported by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime source health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }
}

/// Why a provider could not supply a usable series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Transport,
    UpstreamStatus,
    Malformed,
    Empty,
    InsufficientBars,
    RateLimited,
    CircuitOpen,
    AdapterNotRegistered,
}

/// Provider unavailability. Recovered by the orchestrator by moving on to the
/// next candidate; never surfaced to the user on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transport, message)
    }

    pub fn upstream_status(status: u16) -> Self {
        Self::new(
            SourceErrorKind::UpstreamStatus,
            format!("upstream returned status {status}"),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message)
    }

    pub fn empty(symbol: &Symbol) -> Self {
        Self::new(
            SourceErrorKind::Empty,
            format!("no bars returned for '{symbol}'"),
        )
    }

    pub fn insufficient_bars(symbol: &Symbol, got: usize, min: usize) -> Self {
        Self::new(
            SourceErrorKind::InsufficientBars,
            format!("only {got} bar(s) for '{symbol}', need at least {min}"),
        )
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn circuit_open(provider: ProviderId) -> Self {
        Self::new(
            SourceErrorKind::CircuitOpen,
            format!("{provider} circuit breaker is open; skipping upstream call"),
        )
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self::new(
            SourceErrorKind::AdapterNotRegistered,
            format!("source adapter '{provider}' is not registered"),
        )
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::UpstreamStatus => "source.upstream_status",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::Empty => "source.empty",
            SourceErrorKind::InsufficientBars => "source.insufficient_bars",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::CircuitOpen => "source.circuit_open",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request for trailing daily bars of one provider spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub symbol: Symbol,
    pub window: Window,
    /// Last calendar day of the window, inclusive.
    pub end: TradingDate,
}

impl SeriesRequest {
    pub fn new(symbol: Symbol, window: Window) -> Self {
        Self::ending(symbol, window, TradingDate::today_utc())
    }

    pub fn ending(symbol: Symbol, window: Window, end: TradingDate) -> Self {
        Self {
            symbol,
            window,
            end,
        }
    }

    pub fn start(&self) -> TradingDate {
        self.end.days_before(self.window.days())
    }
}

/// Boxed future returned by adapter calls.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Upstream price provider contract.
///
/// Implementations must be `Send + Sync`; the orchestrator shares them across
/// concurrent sessions behind `Arc`. They keep no per-call state beyond
/// circuit and rate accounting.
pub trait PriceSource: Send + Sync {
    /// Returns the provider this adapter wraps.
    fn id(&self) -> ProviderId;

    /// Fetches the trailing daily series for one symbol spelling.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] for every failure mode: transport failure,
    /// non-success status, malformed payload, empty result, or fewer bars than
    /// the provider's usable minimum.
    fn daily_series<'a>(
        &'a self,
        req: SeriesRequest,
    ) -> SourceFuture<'a, Result<PriceSeries, SourceError>>;

    /// Returns the current health of this source.
    fn health<'a>(&'a self) -> SourceFuture<'a, HealthStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let symbol = Symbol::parse("445380.KS").expect("valid");
        assert_eq!(SourceError::empty(&symbol).code(), "source.empty");
        assert_eq!(
            SourceError::insufficient_bars(&symbol, 3, 6).code(),
            "source.insufficient_bars"
        );
        assert_eq!(SourceError::upstream_status(404).code(), "source.upstream_status");
    }

    #[test]
    fn request_start_trails_end_by_window() {
        let end = TradingDate::parse("2024-12-31").expect("date");
        let request = SeriesRequest::ending(
            Symbol::parse("GRID").expect("symbol"),
            Window::OneYear,
            end,
        );
        assert_eq!(request.start().to_string(), "2024-01-01");
    }
}
