use std::{borrow::Cow, time::Duration};

/// A named remote target with its own cache, timeout, size and quota policy.
///
/// `id` is the join key used by the cache, the rate limiter and the breaker,
/// and must be unique across [`ENDPOINTS`]. URLs may contain `{name}`
/// placeholders that [`Endpoint::render`] fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: Cow<'static, str>,
    pub url: Cow<'static, str>,
    pub ttl: Duration,
    pub timeout: Duration,
    pub max_bytes: usize,
    pub max_per_window: u32,
    pub follow_redirects: bool,
}

const fn builtin(
    id: &'static str,
    url: &'static str,
    ttl_secs: u64,
    timeout_secs: u64,
    max_bytes: usize,
    max_per_window: u32,
    follow_redirects: bool,
) -> Endpoint {
    Endpoint {
        id: Cow::Borrowed(id),
        url: Cow::Borrowed(url),
        ttl: Duration::from_secs(ttl_secs),
        timeout: Duration::from_secs(timeout_secs),
        max_bytes,
        max_per_window,
        follow_redirects,
    }
}

/// The compiled-in registry. No config file can add to or alter it.
pub static ENDPOINTS: &[Endpoint] = &[
    builtin(
        "weather_forecast",
        "https://api.open-meteo.com/v1/forecast?latitude={latitude}&longitude={longitude}&current_weather=true",
        10 * 60,
        10,
        64 * 1024,
        30,
        false,
    ),
    builtin(
        "wikipedia_summary",
        "https://en.wikipedia.org/api/rest_v1/page/summary/{title}",
        60 * 60,
        10,
        256 * 1024,
        30,
        true,
    ),
    builtin(
        "exchange_rates",
        "https://open.er-api.com/v6/latest/{base}",
        60 * 60,
        10,
        64 * 1024,
        10,
        true,
    ),
    builtin(
        "hacker_news_top",
        "https://hacker-news.firebaseio.com/v0/topstories.json",
        5 * 60,
        10,
        128 * 1024,
        20,
        false,
    ),
    builtin(
        "earthquakes_recent",
        "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_hour.geojson",
        5 * 60,
        15,
        1024 * 1024,
        10,
        true,
    ),
];

impl Endpoint {
    /// Look up a registry endpoint by id.
    #[must_use]
    pub fn lookup(id: &str) -> Option<&'static Endpoint> {
        ENDPOINTS.iter().find(|e| e.id == id)
    }

    /// Substitute `{name}` placeholders with percent-encoded values.
    ///
    /// Placeholders without a matching value are left untouched so the
    /// resulting URL fails loudly instead of silently hitting the wrong path.
    #[must_use]
    pub fn render(&self, params: &[(&str, &str)]) -> String {
        params.iter().fold(self.url.to_string(), |url, (name, value)| {
            url.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
        })
    }

    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.url.contains('{')
    }
}
