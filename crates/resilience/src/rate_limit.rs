use std::time::{Duration, Instant};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, labels, resilience as resilience_metrics};

/// Fixed-window quota enforcement per key.
///
/// Windows are not sliding: up to `2 × max_per_window` calls can land across
/// a window boundary (`max` at the end of one window, `max` at the start of
/// the next). This is a known limitation that callers and tests rely on.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    windows: DashMap<String, WindowState>,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started_at: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { retry_after: Duration },
}

impl RateLimiter {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: DashMap::new(),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Consume one unit of `key`'s quota if any is left.
    pub fn allow(&self, key: &str, max_per_window: u32) -> bool {
        matches!(
            self.check_at(key, max_per_window, Instant::now()),
            RateDecision::Allowed
        )
    }

    pub fn check(&self, key: &str, max_per_window: u32) -> RateDecision {
        self.check_at(key, max_per_window, Instant::now())
    }

    /// The entry guard holds the key's shard lock for the whole
    /// reset-then-increment sequence, so concurrent callers on the same key
    /// each consume exactly one unit and never overshoot the quota.
    pub fn check_at(&self, key: &str, max_per_window: u32, now: Instant) -> RateDecision {
        let decision = match self.windows.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                if now.saturating_duration_since(state.started_at) >= self.window {
                    state.started_at = now;
                    state.count = 0;
                }
                self.consume(state, max_per_window, now)
            },
            Entry::Vacant(vacant) => {
                let mut state = vacant.insert(WindowState {
                    started_at: now,
                    count: 0,
                });
                self.consume(state.value_mut(), max_per_window, now)
            },
        };

        if let RateDecision::Denied { retry_after } = decision {
            debug!(
                key,
                max_per_window,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limited"
            );
            #[cfg(feature = "metrics")]
            counter!(
                resilience_metrics::RATE_LIMIT_REJECTIONS_TOTAL,
                labels::ENDPOINT => key.to_string()
            )
            .increment(1);
        }
        decision
    }

    fn consume(&self, state: &mut WindowState, max_per_window: u32, now: Instant) -> RateDecision {
        if state.count >= max_per_window {
            let elapsed = now.saturating_duration_since(state.started_at);
            return RateDecision::Denied {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }
        state.count += 1;
        RateDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{sync::Arc, thread},
    };

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn n_allowed_then_denied_then_reset() {
        let limiter = RateLimiter::new(WINDOW);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("hn", 3, t0), RateDecision::Allowed);
        }
        assert_eq!(
            limiter.check_at("hn", 3, t0 + Duration::from_secs(10)),
            RateDecision::Denied {
                retry_after: Duration::from_secs(50)
            }
        );
        assert_eq!(limiter.check_at("hn", 3, t0 + WINDOW), RateDecision::Allowed);
    }

    #[test]
    fn burst_across_window_boundary_is_allowed() {
        let limiter = RateLimiter::new(WINDOW);
        let t0 = Instant::now();
        assert!(matches!(limiter.check_at("k", 2, t0), RateDecision::Allowed));

        // Tail of the first window and head of the next, one second apart:
        // three calls pass against a quota of two.
        let tail = t0 + WINDOW - Duration::from_secs(1);
        assert!(matches!(limiter.check_at("k", 2, tail), RateDecision::Allowed));
        assert!(matches!(limiter.check_at("k", 2, tail), RateDecision::Denied { .. }));

        let head = t0 + WINDOW;
        assert!(matches!(limiter.check_at("k", 2, head), RateDecision::Allowed));
        assert!(matches!(limiter.check_at("k", 2, head), RateDecision::Allowed));
        assert!(matches!(limiter.check_at("k", 2, head), RateDecision::Denied { .. }));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(WINDOW);
        let t0 = Instant::now();
        assert!(matches!(limiter.check_at("a", 1, t0), RateDecision::Allowed));
        assert!(matches!(limiter.check_at("a", 1, t0), RateDecision::Denied { .. }));
        assert!(matches!(limiter.check_at("b", 1, t0), RateDecision::Allowed));
    }

    #[test]
    fn zero_quota_always_denies() {
        let limiter = RateLimiter::new(WINDOW);
        assert!(!limiter.allow("off", 0));
        assert!(!limiter.allow("off", 0));
    }

    #[test]
    fn concurrent_callers_consume_exactly_one_unit_each() {
        let limiter = Arc::new(RateLimiter::new(WINDOW));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..10).filter(|_| limiter.allow("shared", 50)).count())
            })
            .collect();
        let allowed: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .sum();
        assert_eq!(allowed, 50);
    }
}
