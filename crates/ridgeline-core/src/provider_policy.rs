use std::time::Duration;

use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::ProviderId;

/// Per-provider request budget and payload acceptance rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
    /// Fewer bars than this is treated the same as no data.
    pub min_bars: usize,
    pub timeout_ms: u64,
}

impl ProviderPolicy {
    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            min_bars: 6,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn naver_default() -> Self {
        Self {
            provider_id: ProviderId::Naver,
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
            min_bars: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Yahoo => Self::yahoo_default(),
            ProviderId::Naver => Self::naver_default(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yahoo_requires_more_than_five_bars() {
        let policy = ProviderPolicy::yahoo_default();

        assert_eq!(policy.provider_id, ProviderId::Yahoo);
        assert_eq!(policy.min_bars, 6);
        assert_eq!(policy.quota_window, Duration::from_secs(60));
    }

    #[test]
    fn naver_accepts_any_non_empty_series() {
        let policy = ProviderPolicy::default_for(ProviderId::Naver).with_timeout_ms(2_000);

        assert_eq!(policy.min_bars, 1);
        assert_eq!(policy.timeout_ms, 2_000);
    }
}
