//! Shared resilience state for the remote fetch pipeline.
//!
//! - [`endpoint`]: compiled-in registry of remote endpoints and their policies.
//! - [`cache`]: last-good response per key, judged fresh against a TTL on read.
//! - [`rate_limit`]: fixed-window call quotas per key.
//! - [`breaker`]: per-key circuit breaker with an implicit half-open probe.
//!
//! All three stateful pieces are owned by a [`ResilienceContext`] built once
//! at startup and shared by `Arc`; tests construct a fresh one each.

pub mod breaker;
pub mod cache;
pub mod context;
pub mod endpoint;
pub mod rate_limit;

pub use {
    breaker::{BreakerSnapshot, CircuitBreaker},
    cache::{CachedResponse, DEFAULT_CACHE_CAPACITY, ResponseCache},
    context::ResilienceContext,
    endpoint::{ENDPOINTS, Endpoint},
    rate_limit::{RateDecision, RateLimiter},
};
