//! Provider adapters.
//!
//! Both adapters share [`Upstream`], which owns the transport, circuit breaker
//! and rate budget for one provider and folds every transport outcome into a
//! [`SourceError`].

mod naver;
mod yahoo;

use std::sync::Arc;

use tracing::debug;

pub use naver::NaverAdapter;
pub use yahoo::YahooAdapter;

use crate::circuit_breaker::{Admission, CallOutcome, CircuitBreaker, CircuitState};
use crate::data_source::{HealthState, HealthStatus, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateBudget;
use crate::{Bar, PriceSeries, Symbol, Window};

#[derive(Clone)]
pub(crate) struct Upstream {
    http_client: Arc<dyn HttpClient>,
    policy: ProviderPolicy,
    circuit_breaker: Arc<CircuitBreaker>,
    budget: RateBudget,
}

impl Upstream {
    pub(crate) fn new(http_client: Arc<dyn HttpClient>, policy: ProviderPolicy) -> Self {
        let budget = RateBudget::from_policy(&policy);
        Self {
            http_client,
            policy,
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            budget,
        }
    }

    pub(crate) fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub(crate) fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    /// Issues one GET and returns the body of a 2xx response.
    pub(crate) async fn get(&self, request: HttpRequest) -> Result<String, SourceError> {
        let provider = self.policy.provider_id;

        if let Admission::Refused { retry_in } = self.circuit_breaker.admit() {
            debug!(provider = %provider, retry_in_ms = retry_in.as_millis() as u64, "circuit open");
            return Err(SourceError::circuit_open(provider));
        }
        if !self.budget.try_acquire() {
            return Err(SourceError::rate_limited(format!(
                "{provider} request budget exhausted"
            )));
        }

        let request = request.with_timeout_ms(self.policy.timeout_ms);
        debug!(provider = %provider, url = %request.url, "upstream request");

        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record(CallOutcome::Faulted);
            SourceError::transport(format!("{provider} transport error: {error}"))
        })?;

        self.circuit_breaker
            .record(CallOutcome::from_status(response.status));
        if !response.is_success() {
            return Err(SourceError::upstream_status(response.status));
        }

        Ok(response.body)
    }

    /// Applies the provider's usable-series threshold.
    pub(crate) fn accept(
        &self,
        symbol: &Symbol,
        window: Window,
        bars: Vec<Bar>,
    ) -> Result<PriceSeries, SourceError> {
        if bars.is_empty() {
            return Err(SourceError::empty(symbol));
        }

        let series = PriceSeries::new(symbol.clone(), window, bars);
        if series.len() < self.policy.min_bars {
            return Err(SourceError::insufficient_bars(
                symbol,
                series.len(),
                self.policy.min_bars,
            ));
        }

        Ok(series)
    }

    pub(crate) fn health(&self) -> HealthStatus {
        let rate_available = self.budget.last_granted();
        match self.circuit_breaker.state() {
            CircuitState::Closed => HealthStatus::new(HealthState::Healthy, rate_available),
            CircuitState::HalfOpen => HealthStatus::new(HealthState::Degraded, rate_available),
            CircuitState::Open => HealthStatus::new(HealthState::Unhealthy, false),
        }
    }
}

/// Rounds a price to four decimal places.
pub(crate) fn round_price(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_four_places() {
        assert_eq!(round_price(156.050_049_9), 156.05);
        assert_eq!(round_price(179.852_54), 179.8525);
    }
}
