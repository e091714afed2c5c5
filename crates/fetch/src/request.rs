use {
    std::borrow::Cow,
    tollgate_config::BrowseConfig,
    tollgate_resilience::Endpoint,
};

use crate::safety::BrowsePolicy;

pub const DEFAULT_MAX_REDIRECTS: u8 = 5;

/// Everything the orchestrator needs for one call.
///
/// The endpoint supplies policy (TTL, timeout, byte cap, quota, redirects)
/// and its `id` keys the limiter and breaker. The cache uses `cache_key`, so
/// templated endpoints called with different arguments never share a slot.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub endpoint: Cow<'a, Endpoint>,
    pub url: String,
    pub cache_key: String,
    pub max_redirects: u8,
    /// JSON body; turns the request into an uncached POST.
    pub json_body: Option<serde_json::Value>,
    pub bearer_token: Option<String>,
    /// Browse policy for untrusted URLs. Every hop is re-validated when set.
    pub guard: Option<&'a BrowsePolicy>,
}

impl<'a> FetchRequest<'a> {
    /// A fixed registry endpoint, cached under its id.
    #[must_use]
    pub fn for_endpoint(endpoint: &'a Endpoint) -> Self {
        Self {
            url: endpoint.url.to_string(),
            cache_key: endpoint.id.to_string(),
            endpoint: Cow::Borrowed(endpoint),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            json_body: None,
            bearer_token: None,
            guard: None,
        }
    }

    /// A templated registry endpoint rendered with `params`.
    #[must_use]
    pub fn templated(endpoint: &'a Endpoint, params: &[(&str, &str)]) -> Self {
        let url = endpoint.render(params);
        Self {
            cache_key: format!("{}|{url}", endpoint.id),
            url,
            ..Self::for_endpoint(endpoint)
        }
    }

    /// An arbitrary, untrusted URL fetched under the browse policy.
    #[must_use]
    pub fn browse(url: &str, config: &BrowseConfig, policy: &'a BrowsePolicy) -> Self {
        let endpoint = Endpoint {
            id: Cow::Borrowed("web_fetch"),
            url: Cow::Owned(url.to_string()),
            ttl: config.cache_ttl(),
            timeout: config.timeout(),
            max_bytes: config.max_bytes,
            max_per_window: config.max_per_minute,
            follow_redirects: true,
        };
        Self {
            url: url.to_string(),
            cache_key: format!("web_fetch|{url}"),
            endpoint: Cow::Owned(endpoint),
            max_redirects: config.max_redirects,
            json_body: None,
            bearer_token: None,
            guard: Some(policy),
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.endpoint.to_mut().max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.json_body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    /// POSTs and zero-TTL endpoints bypass the cache entirely.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.json_body.is_none() && !self.endpoint.ttl.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templated_cache_key_includes_url() {
        let Some(ep) = Endpoint::lookup("exchange_rates") else {
            panic!("exchange_rates missing from registry");
        };
        let usd = FetchRequest::templated(ep, &[("base", "USD")]);
        let eur = FetchRequest::templated(ep, &[("base", "EUR")]);
        assert_ne!(usd.cache_key, eur.cache_key);
        assert_eq!(usd.endpoint.id, "exchange_rates");
        assert!(usd.url.ends_with("/USD"));
    }

    #[test]
    fn browse_request_uses_config_policy() {
        let config = BrowseConfig {
            max_redirects: 2,
            max_per_minute: 7,
            ..Default::default()
        };
        let policy = BrowsePolicy::default();
        let req = FetchRequest::browse("https://example.com/", &config, &policy)
            .with_max_bytes(1024);
        assert_eq!(req.endpoint.id, "web_fetch");
        assert_eq!(req.endpoint.max_per_window, 7);
        assert_eq!(req.endpoint.max_bytes, 1024);
        assert_eq!(req.max_redirects, 2);
        assert!(req.guard.is_some());
        assert!(req.is_cacheable());
    }

    #[test]
    fn post_is_never_cacheable() {
        let Some(ep) = Endpoint::lookup("hacker_news_top") else {
            panic!("hacker_news_top missing from registry");
        };
        let req = FetchRequest::for_endpoint(ep).with_json_body(serde_json::json!({}));
        assert!(!req.is_cacheable());
    }
}
