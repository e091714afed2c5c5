use std::time::Duration;

use tollgate_config::ResilienceConfig;

use crate::{breaker::CircuitBreaker, cache::ResponseCache, rate_limit::RateLimiter};

/// Owner of all shared, per-key mutable resilience state.
///
/// Built once at startup and handed to every component by `Arc`.
#[derive(Debug)]
pub struct ResilienceContext {
    pub cache: ResponseCache,
    pub limiter: RateLimiter,
    pub breaker: CircuitBreaker,
}

impl ResilienceContext {
    #[must_use]
    pub fn new(rate_window: Duration, breaker_threshold: u32, breaker_cooldown: Duration) -> Self {
        Self {
            cache: ResponseCache::new(),
            limiter: RateLimiter::new(rate_window),
            breaker: CircuitBreaker::new(breaker_threshold, breaker_cooldown),
        }
    }

    #[must_use]
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            cache: ResponseCache::with_capacity(config.cache_max_entries),
            ..Self::new(
                config.rate_window(),
                config.breaker_threshold,
                config.breaker_cooldown(),
            )
        }
    }
}

impl Default for ResilienceContext {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_applies_tuning() {
        let ctx = ResilienceContext::from_config(&ResilienceConfig {
            rate_window_seconds: 5,
            breaker_threshold: 1,
            breaker_cooldown_seconds: 10,
            cache_max_entries: 8,
        });
        assert_eq!(ctx.limiter.window(), Duration::from_secs(5));
        assert!(ctx.breaker.record_failure("x"));
        assert!(ctx.breaker.is_open("x"));
        assert!(ctx.cache.is_empty());
        assert_eq!(ctx.cache.capacity(), 8);
    }
}
