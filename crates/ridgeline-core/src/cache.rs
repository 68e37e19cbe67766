//! In-memory TTL cache for resolved price series.
//!
//! Entries are keyed by (instrument id, window) and hold a complete series
//! with its provenance. Expiry is checked on read; an expired entry is
//! evicted by the lookup that finds it, there is no background sweep.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{PriceSeries, Provenance, Window};

/// Defines how a resolve call interacts with the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a live entry if present; otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Skip the read, fetch, and store the fresh result.
    Refresh,
    /// Fetch without reading or writing the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub instrument_id: String,
    pub window: Window,
}

impl CacheKey {
    pub fn new(instrument_id: impl Into<String>, window: Window) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            window,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.instrument_id, self.window)
    }
}

/// A complete successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub series: Arc<PriceSeries>,
    pub provenance: Provenance,
}

#[derive(Debug)]
struct Stored {
    entry: CacheEntry,
    expires_at: Instant,
}

impl Stored {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe result cache shared by concurrent resolve calls.
#[derive(Debug, Clone)]
pub struct ResultCache {
    inner: Arc<RwLock<HashMap<CacheKey, Stored>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    /// Returns the live entry for `key`, evicting it first if it has expired.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        {
            let store = self.inner.read().await;
            match store.get(key) {
                None => return None,
                Some(stored) if stored.is_live(now) => return Some(stored.entry.clone()),
                Some(_) => {}
            }
        }

        let mut store = self.inner.write().await;
        if store.get(key).is_some_and(|stored| !stored.is_live(now)) {
            store.remove(key);
        }
        None
    }

    /// Stores a complete entry stamped with the current time. No-op when disabled.
    pub async fn put(&self, key: CacheKey, entry: CacheEntry) {
        if self.is_disabled() {
            return;
        }

        let expires_at = Instant::now() + self.ttl;
        self.inner
            .write()
            .await
            .insert(key, Stored { entry, expires_at });
    }

    /// Number of stored entries, expired ones included until a read evicts them.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, CandidateSymbol, ProviderId, Symbol, TradingDate, UtcDateTime};

    fn entry(code: &str) -> CacheEntry {
        let symbol = Symbol::parse(code).expect("valid symbol");
        let bar = Bar::new(
            TradingDate::new(2024, 1, 2).expect("date"),
            10.0,
            11.0,
            9.0,
            10.5,
            None,
        )
        .expect("bar");
        let candidate = CandidateSymbol::new(ProviderId::Yahoo, symbol.clone());
        CacheEntry {
            series: Arc::new(PriceSeries::new(symbol, Window::OneYear, vec![bar])),
            provenance: Provenance::new(&candidate, UtcDateTime::now()),
        }
    }

    #[tokio::test]
    async fn different_window_is_a_miss() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache
            .put(CacheKey::new("grid", Window::OneYear), entry("GRID"))
            .await;

        assert!(cache.get(&CacheKey::new("grid", Window::OneYear)).await.is_some());
        assert!(cache.get(&CacheKey::new("grid", Window::TwoYears)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_evicted_on_read() {
        let cache = ResultCache::new(Duration::from_secs(300));
        let key = CacheKey::new("ura", Window::OneYear);
        cache.put(key.clone(), entry("URA")).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&key).await.is_some());
        assert_eq!(cache.len().await, 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let cache = ResultCache::disabled();
        cache
            .put(CacheKey::new("pl", Window::OneYear), entry("PL"))
            .await;

        assert!(cache.is_disabled());
        assert!(cache.is_empty().await);
    }

    #[test]
    fn cache_modes() {
        assert!(CacheMode::Use.reads() && CacheMode::Use.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
    }
}
