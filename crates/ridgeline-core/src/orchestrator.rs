//! Fallback orchestration across provider adapters and symbol spellings.
//!
//! [`FallbackOrchestrator::resolve`] walks an instrument's candidate list in
//! order and stops at the first adapter that returns a usable series. Every
//! per-candidate failure is recorded and swallowed; only total exhaustion is
//! reported to the caller. Successful results are cached per
//! (instrument, window), and concurrent misses for the same key wait on a
//! per-key gate so that only one of them reaches the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::{NaverAdapter, YahooAdapter};
use crate::cache::{CacheEntry, CacheKey, CacheMode, ResultCache};
use crate::config::AppConfig;
use crate::data_source::{
    HealthState, HealthStatus, PriceSource, SeriesRequest, SourceError, SourceErrorKind,
};
use crate::http_client::{HttpClient, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::provider_policy::ProviderPolicy;
use crate::{CandidateSymbol, Instrument, PriceSeries, Provenance, ProviderId, UtcDateTime, Window};

/// One candidate that did not produce a usable series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub candidate: CandidateSymbol,
    pub error: SourceError,
}

/// Successful resolve.
#[derive(Debug, Clone)]
pub struct ResolveSuccess {
    pub series: Arc<PriceSeries>,
    /// The candidate that actually produced `series`.
    pub provenance: Provenance,
    pub failed_attempts: Vec<FailedAttempt>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

impl ResolveSuccess {
    /// Candidates contacted in order, ending with the winner.
    pub fn source_chain(&self) -> Vec<CandidateSymbol> {
        self.failed_attempts
            .iter()
            .map(|attempt| attempt.candidate.clone())
            .chain(std::iter::once(self.provenance.candidate()))
            .collect()
    }
}

/// Every candidate for an instrument failed.
#[derive(Debug, Clone, Error)]
#[error(
    "all sources exhausted for '{instrument_id}' ({window}) after {} attempt(s)",
    .attempts.len()
)]
pub struct AllSourcesExhausted {
    pub instrument_id: String,
    pub window: Window,
    pub attempts: Vec<FailedAttempt>,
    pub latency_ms: u64,
}

/// Provider snapshot used by the `sources` command.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub health: HealthStatus,
}

impl SourceSnapshot {
    pub fn available(self) -> bool {
        self.health.state != HealthState::Unhealthy
    }

    pub fn status_label(self) -> &'static str {
        if !self.health.rate_available && self.health.state != HealthState::Unhealthy {
            return "rate_limited";
        }

        match self.health.state {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Adapter registry, result cache and the fallback cascade.
pub struct FallbackOrchestrator {
    adapters: HashMap<ProviderId, Arc<dyn PriceSource>>,
    cache: ResultCache,
    gates: Mutex<HashMap<CacheKey, Gate>>,
}

impl FallbackOrchestrator {
    pub fn new(adapters: Vec<Arc<dyn PriceSource>>, cache: ResultCache) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self {
            adapters,
            cache,
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Registered providers, sorted by name.
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers = self.adapters.keys().copied().collect::<Vec<_>>();
        providers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        providers
    }

    pub async fn snapshot(&self, provider: ProviderId) -> Option<SourceSnapshot> {
        let adapter = self.adapters.get(&provider)?;
        Some(SourceSnapshot {
            id: provider,
            health: adapter.health().await,
        })
    }

    /// Resolves a series for `instrument`, serving a live cache entry when present.
    ///
    /// # Errors
    ///
    /// Returns [`AllSourcesExhausted`] when no candidate produced a usable
    /// series. Nothing is cached in that case.
    pub async fn resolve(
        &self,
        instrument: &Instrument,
        window: Window,
    ) -> Result<ResolveSuccess, AllSourcesExhausted> {
        self.resolve_with(instrument, window, CacheMode::Use).await
    }

    pub async fn resolve_with(
        &self,
        instrument: &Instrument,
        window: Window,
        mode: CacheMode,
    ) -> Result<ResolveSuccess, AllSourcesExhausted> {
        let started = Instant::now();
        let key = CacheKey::new(instrument.id.clone(), window);

        if let Some(hit) = self.cached(&key, mode, started).await {
            return Ok(hit);
        }

        let gate = self.gate(&key);
        let _guard = gate.lock().await;

        // A concurrent miss may have filled the entry while this call waited.
        if let Some(hit) = self.cached(&key, mode, started).await {
            return Ok(hit);
        }

        let success = self.cascade(instrument, window, started).await?;

        if mode.writes() {
            self.cache
                .put(
                    key,
                    CacheEntry {
                        series: Arc::clone(&success.series),
                        provenance: success.provenance.clone(),
                    },
                )
                .await;
        }

        Ok(success)
    }

    async fn cached(
        &self,
        key: &CacheKey,
        mode: CacheMode,
        started: Instant,
    ) -> Option<ResolveSuccess> {
        if !mode.reads() {
            return None;
        }

        let entry = self.cache.get(key).await?;
        info!(key = %key, source = %entry.provenance, "cache hit");
        Some(ResolveSuccess {
            series: entry.series,
            provenance: entry.provenance,
            failed_attempts: Vec::new(),
            warnings: Vec::new(),
            latency_ms: elapsed_ms(started),
            cache_hit: true,
        })
    }

    fn gate(&self, key: &CacheKey) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(key.clone()).or_default())
    }

    async fn cascade(
        &self,
        instrument: &Instrument,
        window: Window,
        started: Instant,
    ) -> Result<ResolveSuccess, AllSourcesExhausted> {
        let mut failed_attempts = Vec::new();

        for candidate in &instrument.candidates {
            debug!(instrument = %instrument.id, candidate = %candidate, "trying candidate");

            match self.attempt(candidate, window).await {
                Ok(series) => {
                    let provenance = Provenance::new(candidate, UtcDateTime::now());
                    let mut warnings = Vec::new();
                    if !failed_attempts.is_empty() {
                        warnings.push(format!(
                            "source fallback succeeded with '{candidate}' after {} failed attempt(s)",
                            failed_attempts.len()
                        ));
                    }

                    info!(
                        instrument = %instrument.id,
                        source = %provenance,
                        bars = series.len(),
                        failed = failed_attempts.len(),
                        "resolved series"
                    );

                    return Ok(ResolveSuccess {
                        series: Arc::new(series),
                        provenance,
                        failed_attempts,
                        warnings,
                        latency_ms: elapsed_ms(started),
                        cache_hit: false,
                    });
                }
                Err(error) => {
                    warn!(
                        instrument = %instrument.id,
                        candidate = %candidate,
                        code = error.code(),
                        "{}",
                        error.message()
                    );
                    failed_attempts.push(FailedAttempt {
                        candidate: candidate.clone(),
                        error,
                    });
                }
            }
        }

        warn!(
            instrument = %instrument.id,
            window = %window,
            attempts = failed_attempts.len(),
            "all sources exhausted"
        );

        Err(AllSourcesExhausted {
            instrument_id: instrument.id.clone(),
            window,
            attempts: failed_attempts,
            latency_ms: elapsed_ms(started),
        })
    }

    async fn attempt(
        &self,
        candidate: &CandidateSymbol,
        window: Window,
    ) -> Result<PriceSeries, SourceError> {
        let provider = candidate.provider;
        let adapter = self
            .adapters
            .get(&provider)
            .ok_or_else(|| SourceError::adapter_not_registered(provider))?;

        if adapter.health().await.state == HealthState::Unhealthy {
            return Err(SourceError::new(
                SourceErrorKind::CircuitOpen,
                format!("{provider} health check reported unhealthy"),
            ));
        }

        adapter
            .daily_series(SeriesRequest::new(candidate.symbol.clone(), window))
            .await
    }
}

/// Wires production adapters from settings, mirroring [`AppConfig`].
pub struct FallbackOrchestratorBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    cache_ttl: Duration,
    timeout_ms: u64,
    enable_yahoo: bool,
    enable_naver: bool,
    extra: Vec<Arc<dyn PriceSource>>,
}

impl Default for FallbackOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            http_client: None,
            cache_ttl: Duration::from_secs(300),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            enable_yahoo: true,
            enable_naver: true,
            extra: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new()
            .with_cache_ttl(config.cache_ttl)
            .with_timeout_ms(config.http_timeout_ms)
            .enable(ProviderId::Yahoo, config.yahoo_enabled)
            .enable(ProviderId::Naver, config.naver_enabled)
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn enable(mut self, provider: ProviderId, enabled: bool) -> Self {
        match provider {
            ProviderId::Yahoo => self.enable_yahoo = enabled,
            ProviderId::Naver => self.enable_naver = enabled,
        }
        self
    }

    /// Registers an adapter, replacing the built-in one for the same provider.
    pub fn with_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.extra.push(source);
        self
    }

    pub fn build(self) -> FallbackOrchestrator {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let mut adapters: Vec<Arc<dyn PriceSource>> = Vec::new();

        if self.enable_yahoo {
            adapters.push(Arc::new(YahooAdapter::with_policy(
                Arc::clone(&http_client),
                ProviderPolicy::yahoo_default().with_timeout_ms(self.timeout_ms),
            )));
        }
        if self.enable_naver {
            adapters.push(Arc::new(NaverAdapter::with_policy(
                Arc::clone(&http_client),
                ProviderPolicy::naver_default().with_timeout_ms(self.timeout_ms),
            )));
        }
        // Later entries win when ids collide.
        adapters.extend(self.extra);

        FallbackOrchestrator::new(adapters, ResultCache::new(self.cache_ttl))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::NoopHttpClient;

    #[test]
    fn builder_registers_enabled_providers() {
        let orchestrator = FallbackOrchestratorBuilder::new()
            .with_http_client(Arc::new(NoopHttpClient))
            .enable(ProviderId::Naver, false)
            .build();

        assert_eq!(orchestrator.providers(), vec![ProviderId::Yahoo]);
    }

    #[test]
    fn builder_uses_configured_ttl() {
        let orchestrator = FallbackOrchestratorBuilder::new()
            .with_http_client(Arc::new(NoopHttpClient))
            .with_cache_ttl(Duration::from_secs(60))
            .build();

        assert_eq!(orchestrator.cache().ttl(), Duration::from_secs(60));
        assert_eq!(
            orchestrator.providers(),
            vec![ProviderId::Naver, ProviderId::Yahoo]
        );
    }

    #[tokio::test]
    async fn snapshot_reports_fresh_adapter_healthy() {
        let orchestrator = FallbackOrchestratorBuilder::new()
            .with_http_client(Arc::new(NoopHttpClient))
            .build();

        let snapshot = orchestrator
            .snapshot(ProviderId::Yahoo)
            .await
            .expect("yahoo is registered");

        assert!(snapshot.available());
        assert_eq!(snapshot.status_label(), "healthy");
    }
}
