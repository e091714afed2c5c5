//! Manual redirect following with a hard hop budget.
//!
//! The HTTP client never follows redirects itself; every hop goes back
//! through [`Fetcher`] so callers can validate the next URL before any
//! connection is made.

use {async_trait::async_trait, url::Url};

use crate::error::{Error, Result};

/// Statuses that trigger another hop. Everything else is terminal.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// The parts of a response the follower needs to see.
pub trait Hop {
    fn status(&self) -> u16;
    fn location(&self) -> Option<&str>;
}

/// Performs a single request without following redirects.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Response: Hop + Send;

    async fn fetch(&self, url: &Url) -> Result<Self::Response>;
}

/// Resolves a `Location` header against the URL that produced it.
pub trait UrlResolver: Send + Sync {
    fn resolve(&self, base: &Url, location: &str) -> Option<Url>;
}

/// Standard RFC 3986 reference resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct JoinResolver;

impl UrlResolver for JoinResolver {
    fn resolve(&self, base: &Url, location: &str) -> Option<Url> {
        base.join(location.trim()).ok()
    }
}

#[derive(Debug)]
pub struct Followed<R> {
    pub final_url: Url,
    pub response: R,
    pub redirects: u8,
}

/// Follow redirects from `start`, allowing at most `max_redirects` hops.
///
/// With an endless chain the fetcher is called `max_redirects + 1` times
/// before [`Error::TooManyRedirects`] is returned.
pub async fn follow<F, R>(
    fetcher: &F,
    resolver: &R,
    start: Url,
    max_redirects: u8,
) -> Result<Followed<F::Response>>
where
    F: Fetcher + ?Sized,
    R: UrlResolver + ?Sized,
{
    let mut current = start;
    let mut hops: u8 = 0;

    loop {
        let response = fetcher.fetch(&current).await?;
        if !REDIRECT_STATUSES.contains(&response.status()) {
            return Ok(Followed {
                final_url: current,
                response,
                redirects: hops,
            });
        }

        let Some(location) = response.location() else {
            return Err(Error::RedirectNoLocation {
                url: current.to_string(),
            });
        };
        if hops >= max_redirects {
            return Err(Error::TooManyRedirects { max: max_redirects });
        }
        let Some(next) = resolver.resolve(&current, location) else {
            return Err(Error::invalid_url(format!(
                "cannot resolve redirect target {location:?} against {current}"
            )));
        };

        tracing::debug!(from = %current, to = %next, hop = hops + 1, "following redirect");
        current = next;
        hops += 1;
    }
}
