//! Per-provider circuit breaker.
//!
//! The breaker only counts provider faults. A 404 for one ticker spelling is
//! a symbol mismatch, not a sign the vendor is down, so it resets the streak
//! the same way a served series does.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Where the breaker currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// How an upstream exchange ended, as far as provider health is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The provider answered, whatever the answer was.
    Answered,
    /// Transport failure, throttling or a server fault.
    Faulted,
}

impl CallOutcome {
    /// Classifies an HTTP status. Only 429 and 5xx count against the provider.
    pub const fn from_status(status: u16) -> Self {
        if status == 429 || status >= 500 {
            Self::Faulted
        } else {
            Self::Answered
        }
    }
}

/// Whether a request may go out right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// The cool-down elapsed; this single request decides whether to close.
    Probe,
    Refused { retry_in: Duration },
}

impl Admission {
    pub const fn is_refused(self) -> bool {
        matches!(self, Self::Refused { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cool_down: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
struct Streak {
    faults: u32,
    opened_at: Option<Instant>,
    probing: bool,
    trips: u64,
}

impl Streak {
    /// An open circuit whose cool-down has run out reports `HalfOpen` even
    /// before the probe is admitted, so health checks let the probe through.
    fn state(&self, cool_down: Duration) -> CircuitState {
        match self.opened_at {
            None => CircuitState::Closed,
            Some(_) if self.probing => CircuitState::HalfOpen,
            Some(since) if since.elapsed() >= cool_down => CircuitState::HalfOpen,
            Some(_) => CircuitState::Open,
        }
    }
}

/// Thread-safe breaker shared by every request to one provider.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    streak: Mutex<Streak>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            streak: Mutex::new(Streak::default()),
        }
    }

    fn streak(&self) -> MutexGuard<'_, Streak> {
        // Plain counters stay consistent even if a holder panicked.
        self.streak.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides whether a request may go out. A probe that never reports back
    /// is replaced by a fresh one after another cool-down.
    pub fn admit(&self) -> Admission {
        let mut streak = self.streak();
        let Some(since) = streak.opened_at else {
            return Admission::Allowed;
        };

        let elapsed = since.elapsed();
        if elapsed >= self.config.cool_down {
            streak.probing = true;
            streak.opened_at = Some(Instant::now());
            Admission::Probe
        } else {
            Admission::Refused {
                retry_in: self.config.cool_down - elapsed,
            }
        }
    }

    pub fn record(&self, outcome: CallOutcome) {
        let mut streak = self.streak();
        match outcome {
            CallOutcome::Answered => {
                streak.faults = 0;
                streak.opened_at = None;
                streak.probing = false;
            }
            CallOutcome::Faulted => {
                streak.faults = streak.faults.saturating_add(1);
                if streak.probing || streak.faults >= self.config.failure_threshold {
                    if streak.opened_at.is_none() || streak.probing {
                        streak.trips += 1;
                    }
                    streak.opened_at = Some(Instant::now());
                    streak.probing = false;
                }
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.streak().state(self.config.cool_down)
    }

    /// How many times the breaker has opened since construction.
    pub fn trips(&self) -> u64 {
        self.streak().trips
    }
}
