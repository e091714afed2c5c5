use std::time::{Duration, Instant};

use {dashmap::DashMap, tracing::warn};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, labels, resilience as resilience_metrics};

/// Per-key failure isolation.
///
/// States are CLOSED (no entry, or below threshold) and OPEN
/// (`now < open_until`). Half-open is implicit and not tracked:
/// once the cooldown lapses the next call goes through, and because
/// `failure_count` is still at or past the threshold a single failed probe
/// re-opens immediately while a success deletes the state.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    states: DashMap<String, BreakerState>,
}

#[derive(Debug, Clone, Copy, Default)]
struct BreakerState {
    failure_count: u32,
    open_until: Option<Instant>,
}

/// Diagnostic view of a key's breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub failure_count: u32,
    pub open_until: Option<Instant>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            states: DashMap::new(),
        }
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.is_open_at(key, Instant::now())
    }

    pub fn is_open_at(&self, key: &str, now: Instant) -> bool {
        self.states
            .get(key)
            .and_then(|state| state.open_until)
            .is_some_and(|until| now < until)
    }

    /// Full reset: the key's state is removed, not decremented.
    pub fn record_success(&self, key: &str) {
        self.states.remove(key);
    }

    /// Returns `true` when this failure tripped the breaker open.
    pub fn record_failure(&self, key: &str) -> bool {
        self.record_failure_at(key, Instant::now())
    }

    pub fn record_failure_at(&self, key: &str, now: Instant) -> bool {
        let mut state = self.states.entry(key.to_string()).or_default();
        state.failure_count = state.failure_count.saturating_add(1);

        let already_open = state.open_until.is_some_and(|until| now < until);
        if state.failure_count < self.threshold || already_open {
            return false;
        }
        state.open_until = Some(now + self.cooldown);
        warn!(
            key,
            failures = state.failure_count,
            cooldown_secs = self.cooldown.as_secs(),
            "circuit breaker opened"
        );
        #[cfg(feature = "metrics")]
        counter!(resilience_metrics::BREAKER_TRIPS_TOTAL, labels::ENDPOINT => key.to_string())
            .increment(1);
        true
    }

    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<BreakerSnapshot> {
        self.states.get(key).map(|state| BreakerSnapshot {
            failure_count: state.failure_count,
            open_until: state.open_until,
        })
    }
}
