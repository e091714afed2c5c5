use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION},
    tollgate_config::{BrowseConfig, HttpConfig},
    tollgate_resilience::{CachedResponse, RateDecision, ResilienceContext},
    tracing::{debug, info, warn},
    url::Url,
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, fetch as fetch_metrics, histogram, labels};

use crate::{
    error::{Error, FetchCode, Result},
    redirect::{self, Fetcher, Followed, Hop, JoinResolver},
    request::FetchRequest,
    result::FetchResult,
    safety::{self, HostResolver, SystemResolver},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Orchestrates every outbound call: breaker, limiter, cache, redirects,
/// browse safety and a byte-capped download.
///
/// Cheap to clone; all clones share the same connection pool and
/// [`ResilienceContext`].
#[derive(Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    resilience: Arc<ResilienceContext>,
    resolver: Arc<dyn HostResolver>,
    accept_language: Option<String>,
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("accept_language", &self.accept_language)
            .finish_non_exhaustive()
    }
}

impl FetchClient {
    pub fn new(
        http: &HttpConfig,
        browse: &BrowseConfig,
        resilience: Arc<ResilienceContext>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&http.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http: client,
            resilience,
            resolver: Arc::new(SystemResolver),
            accept_language: browse.accept_language.clone(),
        })
    }

    /// Replace the DNS resolver used for browse-safety checks.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resilience(&self) -> &Arc<ResilienceContext> {
        &self.resilience
    }

    /// Run one request through the full pipeline. Never fails; every
    /// outcome is described by the returned [`FetchResult`].
    pub async fn fetch(&self, req: &FetchRequest<'_>) -> FetchResult {
        let started = Instant::now();
        let result = self.run(req, started).await;
        self.record(req, &result);
        result
    }

    async fn run(&self, req: &FetchRequest<'_>, started: Instant) -> FetchResult {
        let endpoint = &*req.endpoint;
        let key = endpoint.id.as_ref();

        if self.resilience.breaker.is_open(key) {
            let err = Error::CircuitOpen {
                key: key.to_string(),
            };
            return FetchResult::rejected(&err, started.elapsed());
        }

        let url = match self.initial_url(req).await {
            Ok(url) => url,
            Err(e) => return FetchResult::rejected(&e, started.elapsed()),
        };

        if let RateDecision::Denied { retry_after } =
            self.resilience.limiter.check(key, endpoint.max_per_window)
        {
            let err = Error::RateLimited {
                key: key.to_string(),
                retry_after_secs: retry_after.as_secs().max(1),
            };
            return FetchResult::rejected(&err, started.elapsed());
        }

        let cacheable = req.is_cacheable();
        if cacheable
            && let Some(hit) = self
                .resilience
                .cache
                .get(&req.cache_key, endpoint.ttl)
                .and_then(|hit| fit_to_cap(hit, endpoint.max_bytes))
        {
            debug!(endpoint = key, cache_key = %req.cache_key, "serving from cache");
            return FetchResult::cached(hit, started.elapsed());
        }

        let transport = Transport {
            client: self,
            req,
            validated: url.clone(),
        };
        let followed = if endpoint.follow_redirects {
            redirect::follow(&transport, &JoinResolver, url, req.max_redirects).await
        } else {
            transport.fetch(&url).await.map(|response| Followed {
                final_url: url,
                response,
                redirects: 0,
            })
        };

        let Followed {
            final_url,
            response: Response(mut response),
            redirects,
        } = match followed {
            Ok(followed) => followed,
            Err(e) => {
                if e.is_endpoint_failure() {
                    self.resilience.breaker.record_failure(key);
                }
                warn!(endpoint = key, code = %e.code(), error = %e, "fetch failed");
                return FetchResult::rejected(&e, started.elapsed());
            },
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (bytes, truncated) = match read_capped(&mut response, endpoint.max_bytes).await {
            Ok(read) => read,
            Err(e) => {
                self.resilience.breaker.record_failure(key);
                let err = Error::from(e);
                warn!(endpoint = key, error = %err, "failed reading response body");
                let mut result = FetchResult::rejected(&err, started.elapsed());
                result.http_status = Some(status.as_u16());
                result.final_url = Some(final_url.to_string());
                return result;
            },
        };
        let body = decode_body(bytes, truncated);

        if !status.is_success() {
            self.resilience.breaker.record_failure(key);
            warn!(endpoint = key, status = status.as_u16(), "endpoint returned error status");
            return FetchResult {
                ok: false,
                code: Some(FetchCode::HttpError),
                message: Some(format!("HTTP {status}")),
                http_status: Some(status.as_u16()),
                final_url: Some(final_url.to_string()),
                body,
                content_type,
                latency: started.elapsed(),
                truncated,
            };
        }

        self.resilience.breaker.record_success(key);
        if cacheable {
            let stored = CachedResponse {
                body: body.clone(),
                content_type: content_type.clone(),
                truncated_at: truncated.then_some(endpoint.max_bytes),
            };
            self.resilience
                .cache
                .put(&req.cache_key, stored, endpoint.ttl);
        }
        info!(
            endpoint = key,
            status = status.as_u16(),
            bytes = body.len(),
            truncated,
            redirects,
            "fetch complete"
        );
        FetchResult {
            ok: true,
            code: None,
            message: None,
            http_status: Some(status.as_u16()),
            final_url: Some(final_url.to_string()),
            body,
            content_type,
            latency: started.elapsed(),
            truncated,
        }
    }

    /// Guarded requests are validated before any quota is spent but after
    /// the breaker, so an open circuit never costs a DNS lookup; trusted
    /// endpoints only need a well-formed http(s) URL.
    async fn initial_url(&self, req: &FetchRequest<'_>) -> Result<Url> {
        match req.guard {
            Some(policy) => safety::validate(&req.url, policy, self.resolver.as_ref()).await,
            None => {
                let url = Url::parse(&req.url)
                    .map_err(|e| Error::invalid_url(format!("{}: {e}", req.url)))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(Error::invalid_url(format!(
                        "unsupported scheme {:?}",
                        url.scheme()
                    )));
                }
                Ok(url)
            },
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record(&self, req: &FetchRequest<'_>, result: &FetchResult) {
        #[cfg(feature = "metrics")]
        {
            let endpoint = req.endpoint.id.to_string();
            let code = result.code.map_or("ok", |c| c.as_str());
            counter!(
                fetch_metrics::REQUESTS_TOTAL,
                labels::ENDPOINT => endpoint.clone(),
                labels::CODE => code
            )
            .increment(1);
            histogram!(fetch_metrics::DURATION_SECONDS, labels::ENDPOINT => endpoint.clone())
                .record(result.latency.as_secs_f64());
            counter!(fetch_metrics::BYTES_TOTAL, labels::ENDPOINT => endpoint.clone())
                .increment(result.body.len() as u64);
            if result.truncated {
                counter!(fetch_metrics::TRUNCATED_TOTAL, labels::ENDPOINT => endpoint)
                    .increment(1);
            }
        }
    }
}

struct Response(reqwest::Response);

impl Hop for Response {
    fn status(&self) -> u16 {
        self.0.status().as_u16()
    }

    fn location(&self) -> Option<&str> {
        self.0.headers().get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// One request per hop, re-validating redirect targets for guarded requests.
struct Transport<'a> {
    client: &'a FetchClient,
    req: &'a FetchRequest<'a>,
    validated: Url,
}

#[async_trait]
impl Fetcher for Transport<'_> {
    type Response = Response;

    async fn fetch(&self, url: &Url) -> Result<Response> {
        if let Some(policy) = self.req.guard
            && *url != self.validated
        {
            safety::validate_url(url, policy, self.client.resolver.as_ref()).await?;
        }

        let mut builder = match &self.req.json_body {
            Some(body) => self.client.http.post(url.clone()).json(body),
            None => self.client.http.get(url.clone()),
        };
        builder = builder.timeout(self.req.endpoint.timeout);
        if let Some(token) = &self.req.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(lang) = &self.client.accept_language {
            builder = builder.header(ACCEPT_LANGUAGE, lang);
        }
        Ok(Response(builder.send().await?))
    }
}

async fn read_capped(
    response: &mut reqwest::Response,
    max_bytes: usize,
) -> reqwest::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = max_bytes.saturating_sub(buf.len());
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok((buf, false))
}

/// Adapt a cached body to the caller's byte cap. A body cut under a smaller
/// cap than the caller allows is a miss; a longer one is cut down.
fn fit_to_cap(mut hit: CachedResponse, max_bytes: usize) -> Option<CachedResponse> {
    if let Some(cap) = hit.truncated_at
        && cap < max_bytes
    {
        return None;
    }
    if hit.body.len() > max_bytes {
        let mut end = max_bytes;
        while !hit.body.is_char_boundary(end) {
            end -= 1;
        }
        hit.body.truncate(end);
        hit.truncated_at = Some(max_bytes);
    }
    Some(hit)
}

/// Decode as UTF-8, dropping a multi-byte sequence split by truncation.
fn decode_body(mut bytes: Vec<u8>, truncated: bool) -> String {
    if truncated
        && let Err(e) = std::str::from_utf8(&bytes)
        && e.error_len().is_none()
    {
        bytes.truncate(e.valid_up_to());
    }
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::safety::BrowsePolicy,
        std::{
            borrow::Cow,
            io,
            net::IpAddr,
            sync::atomic::{AtomicUsize, Ordering},
        },
        tollgate_resilience::Endpoint,
    };

    struct StaticResolver(Vec<IpAddr>);

    #[async_trait]
    impl HostResolver for StaticResolver {
        async fn resolve(&self, _host: &str, _port: u16) -> io::Result<Vec<IpAddr>> {
            Ok(self.0.clone())
        }
    }

    fn endpoint(id: &'static str, url: String) -> Endpoint {
        Endpoint {
            id: Cow::Borrowed(id),
            url: Cow::Owned(url),
            ttl: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            max_bytes: 1024,
            max_per_window: 100,
            follow_redirects: true,
        }
    }

    fn client() -> FetchClient {
        FetchClient::new(
            &HttpConfig::default(),
            &BrowseConfig::default(),
            Arc::new(ResilienceContext::new(
                Duration::from_secs(60),
                2,
                Duration::from_secs(60),
            )),
        )
        .unwrap()
    }

    fn loopback_policy() -> BrowsePolicy {
        BrowsePolicy {
            ssrf_exemptions: vec!["127.0.0.0/8".parse().unwrap()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn second_call_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data")
            .with_header("content-type", "application/json")
            .with_body(r#"{"n":1}"#)
            .expect(1)
            .create_async()
            .await;
        let ep = endpoint("data", format!("{}/data", server.url()));
        let client = client();

        let first = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert!(first.ok, "{first:?}");
        assert_eq!(first.code, None);
        assert_eq!(first.http_status, Some(200));
        assert_eq!(first.content_type.as_deref(), Some("application/json"));

        let second = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert!(second.ok);
        assert_eq!(second.code, Some(FetchCode::Cached));
        assert_eq!(second.body, r#"{"n":1}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failures_trip_breaker_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(500)
            .with_body("boom")
            .expect(2)
            .create_async()
            .await;
        let ep = endpoint("flaky", format!("{}/flaky", server.url()));
        let client = client();

        for _ in 0..2 {
            let res = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
            assert_eq!(res.code, Some(FetchCode::HttpError));
            assert_eq!(res.http_status, Some(500));
            assert_eq!(res.body, "boom");
        }
        let res = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert_eq!(res.code, Some(FetchCode::CircuitOpen));
        mock.assert_async().await;
        assert_eq!(
            client.resilience().breaker.snapshot("flaky").map(|s| s.failure_count),
            Some(2)
        );
    }

    #[tokio::test]
    async fn open_circuit_does_not_consume_quota() {
        let client = client();
        let mut ep = endpoint("guarded", "http://127.0.0.1:1/".into());
        ep.max_per_window = 1;
        for _ in 0..2 {
            client.resilience().breaker.record_failure("guarded");
        }
        let res = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert_eq!(res.code, Some(FetchCode::CircuitOpen));
        assert!(client.resilience().limiter.allow("guarded", 1));
    }

    #[tokio::test]
    async fn quota_exhaustion_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/q")
            .with_body("ok")
            .expect(1)
            .create_async()
            .await;
        let mut ep = endpoint("quota", format!("{}/q", server.url()));
        ep.max_per_window = 1;
        ep.ttl = Duration::ZERO;
        let client = client();

        assert!(client.fetch(&FetchRequest::for_endpoint(&ep)).await.ok);
        let res = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert_eq!(res.code, Some(FetchCode::RateLimited));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn body_truncated_at_byte_cap() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/big")
            .with_body("é".repeat(600))
            .create_async()
            .await;
        let mut ep = endpoint("big", format!("{}/big", server.url()));
        ep.max_bytes = 101;
        let res = client().fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert!(res.ok);
        assert!(res.truncated);
        assert_eq!(res.body.len(), 100);
        assert!(res.body.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn follows_redirect_to_terminal_body() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "/end")
            .create_async()
            .await;
        let _end = server
            .mock("GET", "/end")
            .with_body("arrived")
            .create_async()
            .await;
        let ep = endpoint("hop", format!("{}/start", server.url()));
        let res = client().fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert!(res.ok, "{res:?}");
        assert_eq!(res.body, "arrived");
        assert!(res.final_url.unwrap().ends_with("/end"));
    }

    #[tokio::test]
    async fn redirects_disabled_returns_3xx_as_error() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "/end")
            .create_async()
            .await;
        let mut ep = endpoint("nohop", format!("{}/start", server.url()));
        ep.follow_redirects = false;
        let res = client().fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert_eq!(res.code, Some(FetchCode::HttpError));
        assert_eq!(res.http_status, Some(302));
    }

    #[tokio::test]
    async fn redirect_loop_counts_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _loop = server
            .mock("GET", "/loop")
            .with_status(301)
            .with_header("location", "/loop")
            .expect(3)
            .create_async()
            .await;
        let ep = endpoint("loop", format!("{}/loop", server.url()));
        let client = client();
        let mut req = FetchRequest::for_endpoint(&ep);
        req.max_redirects = 2;
        let res = client.fetch(&req).await;
        assert_eq!(res.code, Some(FetchCode::TooManyRedirects));
        assert!(client.resilience().breaker.snapshot("loop").is_some());
    }

    #[tokio::test]
    async fn guarded_request_blocks_private_targets() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/").expect(0).create_async().await;
        let client = client();
        let config = BrowseConfig::default();
        let policy = BrowsePolicy::default();

        let res = client
            .fetch(&FetchRequest::browse(&server.url(), &config, &policy))
            .await;
        assert_eq!(res.code, Some(FetchCode::SsrfBlocked));
        // Policy rejections neither spend quota nor touch the breaker.
        assert!(client.resilience().breaker.snapshot("web_fetch").is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn guarded_redirect_into_private_network_blocked() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "http://internal.test/admin")
            .create_async()
            .await;
        let resolver = StaticResolver(vec!["10.0.0.5".parse().unwrap()]);
        let client = client().with_resolver(Arc::new(resolver));
        let config = BrowseConfig::default();
        let policy = loopback_policy();

        let url = format!("{}/start", server.url());
        let res = client
            .fetch(&FetchRequest::browse(&url, &config, &policy))
            .await;
        assert_eq!(res.code, Some(FetchCode::SsrfBlocked));
        assert!(client.resilience().breaker.snapshot("web_fetch").is_none());
    }

    #[tokio::test]
    async fn guarded_fetch_with_exemption_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/page")
            .match_header("accept-language", "de-CH")
            .with_header("content-type", "text/html")
            .with_body("<p>hallo</p>")
            .create_async()
            .await;
        let config = BrowseConfig {
            accept_language: Some("de-CH".into()),
            ..Default::default()
        };
        let client = FetchClient::new(
            &HttpConfig::default(),
            &config,
            Arc::new(ResilienceContext::default()),
        )
        .unwrap();
        let policy = loopback_policy();
        let url = format!("{}/page", server.url());
        let res = client
            .fetch(&FetchRequest::browse(&url, &config, &policy))
            .await;
        assert!(res.ok, "{res:?}");
        assert_eq!(res.body, "<p>hallo</p>");
    }

    #[tokio::test]
    async fn connection_refused_is_connect_failed() {
        let ep = endpoint("down", "http://127.0.0.1:1/".into());
        let client = client();
        let res = client.fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert_eq!(res.code, Some(FetchCode::ConnectFailed));
        assert!(!res.ok);
        assert!(client.resilience().breaker.snapshot("down").is_some());
    }

    #[tokio::test]
    async fn post_requests_bypass_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rpc")
            .match_header("authorization", "Bearer s3cret")
            .match_body(mockito::Matcher::Json(serde_json::json!({"id": 1})))
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;
        let ep = endpoint("rpc", format!("{}/rpc", server.url()));
        let client = client();
        for _ in 0..2 {
            let req = FetchRequest::for_endpoint(&ep)
                .with_json_body(serde_json::json!({"id": 1}))
                .with_bearer_token(Some("s3cret".into()));
            let res = client.fetch(&req).await;
            assert!(res.ok);
            assert_eq!(res.code, None);
        }
        mock.assert_async().await;
        assert!(client.resilience().cache.is_empty());
    }

    #[tokio::test]
    async fn non_http_endpoint_url_is_invalid() {
        let ep = endpoint("file", "file:///etc/hosts".into());
        let res = client().fetch(&FetchRequest::for_endpoint(&ep)).await;
        assert_eq!(res.code, Some(FetchCode::InvalidUrl));
    }

    #[tokio::test]
    async fn cached_body_cut_under_smaller_cap_is_refetched() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/article")
            .with_body("0123456789abcdef")
            .expect(2)
            .create_async()
            .await;
        let client = client();
        let config = BrowseConfig::default();
        let policy = loopback_policy();
        let url = format!("{}/article", server.url());

        let short = client
            .fetch(&FetchRequest::browse(&url, &config, &policy).with_max_bytes(4))
            .await;
        assert_eq!(short.body, "0123");
        assert!(short.truncated);

        let full = client
            .fetch(&FetchRequest::browse(&url, &config, &policy).with_max_bytes(1000))
            .await;
        assert!(full.ok, "{full:?}");
        assert_eq!(full.code, None);
        assert_eq!(full.body, "0123456789abcdef");
        assert!(!full.truncated);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cached_body_is_cut_to_a_smaller_cap() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/article")
            .with_body("0123456789abcdef")
            .expect(1)
            .create_async()
            .await;
        let client = client();
        let config = BrowseConfig::default();
        let policy = loopback_policy();
        let url = format!("{}/article", server.url());

        let full = client
            .fetch(&FetchRequest::browse(&url, &config, &policy).with_max_bytes(1000))
            .await;
        assert!(!full.truncated);

        let short = client
            .fetch(&FetchRequest::browse(&url, &config, &policy).with_max_bytes(6))
            .await;
        assert_eq!(short.code, Some(FetchCode::Cached));
        assert_eq!(short.body, "012345");
        assert!(short.truncated);

        let again = client
            .fetch(&FetchRequest::browse(&url, &config, &policy).with_max_bytes(6))
            .await;
        assert_eq!(again.code, Some(FetchCode::Cached));
        assert!(again.truncated);
        mock.assert_async().await;
    }

    #[test]
    fn fit_to_cap_respects_char_boundaries() {
        let hit = CachedResponse {
            body: "aéé".into(),
            content_type: None,
            truncated_at: None,
        };
        let cut = fit_to_cap(hit.clone(), 4).unwrap();
        assert_eq!(cut.body, "aé");
        assert_eq!(cut.truncated_at, Some(4));
        assert_eq!(fit_to_cap(hit.clone(), 5).unwrap(), hit);

        let stored_short = CachedResponse {
            truncated_at: Some(4),
            ..cut
        };
        assert!(fit_to_cap(stored_short.clone(), 8).is_none());
        assert_eq!(fit_to_cap(stored_short, 4).unwrap().body, "aé");
    }

    struct CountingResolver(AtomicUsize);

    #[async_trait]
    impl HostResolver for CountingResolver {
        async fn resolve(&self, _host: &str, _port: u16) -> io::Result<Vec<IpAddr>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["93.184.216.34".parse().unwrap()])
        }
    }

    #[tokio::test]
    async fn open_circuit_skips_dns_lookup() {
        let resolver = Arc::new(CountingResolver(AtomicUsize::new(0)));
        let client = client().with_resolver(resolver.clone());
        for _ in 0..2 {
            client.resilience().breaker.record_failure("web_fetch");
        }
        let config = BrowseConfig::default();
        let policy = BrowsePolicy::default();

        let res = client
            .fetch(&FetchRequest::browse("https://news.example.org/", &config, &policy))
            .await;
        assert_eq!(res.code, Some(FetchCode::CircuitOpen));
        assert_eq!(resolver.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn decode_drops_split_multibyte_tail() {
        let bytes = "aé".as_bytes()[..2].to_vec();
        assert_eq!(decode_body(bytes, true), "a");
        assert_eq!(decode_body(b"plain".to_vec(), false), "plain");
    }
}
