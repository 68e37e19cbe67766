//! Core library for ridgeline.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Symbol resolution for US and KRX listings
//! - Provider adapters (Yahoo, Naver) behind the [`PriceSource`] contract
//! - The fallback orchestrator and its TTL result cache
//! - Moving averages, Fibonacci levels and the dashboard view-model
//! - Process configuration and the response envelope

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod dashboard;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod orchestrator;
pub mod provider_policy;
pub mod source;
pub mod symbols;
pub mod throttling;

pub use adapters::{NaverAdapter, YahooAdapter};
pub use cache::{CacheEntry, CacheKey, CacheMode, ResultCache};
pub use circuit_breaker::{
    Admission, CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
pub use config::{AppConfig, Watchlist, WatchlistEntry};
pub use dashboard::{
    Advisory, ChartSpec, DashboardView, Metric, OverlaySeries, ReferenceLevel, SummaryPanel,
};
pub use data_source::{
    HealthState, HealthStatus, PriceSource, SeriesRequest, SourceError, SourceErrorKind,
    SourceFuture,
};
pub use domain::{
    Bar, CandidateSymbol, CostBasis, Currency, Instrument, KrxBoard, PriceSeries, Provenance,
    Symbol, TradingDate, UtcDateTime, Window,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{ConfigError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use indicators::{
    FibonacciLevels, MovingAverage, PeriodRange, PriceZone, RiskState, TechnicalView,
};
pub use orchestrator::{
    AllSourcesExhausted, FailedAttempt, FallbackOrchestrator, FallbackOrchestratorBuilder,
    ResolveSuccess, SourceSnapshot,
};
pub use provider_policy::ProviderPolicy;
pub use source::ProviderId;
pub use throttling::RateBudget;
