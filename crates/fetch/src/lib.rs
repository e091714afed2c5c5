//! Security-hardened remote fetch pipeline.
//!
//! [`FetchClient`] is the single entry point for tools that need the network.
//! It composes the shared [`ResilienceContext`](tollgate_resilience::ResilienceContext)
//! (breaker, limiter, cache) with the [`redirect`] follower and the [`safety`]
//! validator, and always answers with a [`FetchResult`] value instead of an
//! error.

pub mod client;
pub mod error;
pub mod redirect;
pub mod request;
pub mod result;
pub mod safety;

pub use {
    client::FetchClient,
    error::{Error, FetchCode, Result},
    request::FetchRequest,
    result::FetchResult,
    safety::{BrowsePolicy, HostResolver, SystemResolver},
};
