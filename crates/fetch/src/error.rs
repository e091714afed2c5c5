use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Machine-readable outcome category surfaced to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchCode {
    Cached,
    CircuitOpen,
    RateLimited,
    HttpError,
    ConnectFailed,
    DnsFailed,
    SsrfBlocked,
    DenylistBlocked,
    AllowlistBlocked,
    TooManyRedirects,
    RedirectNoLocation,
    InvalidUrl,
}

impl FetchCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::CircuitOpen => "circuit_open",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::ConnectFailed => "connect_failed",
            Self::DnsFailed => "dns_failed",
            Self::SsrfBlocked => "ssrf_blocked",
            Self::DenylistBlocked => "denylist_blocked",
            Self::AllowlistBlocked => "allowlist_blocked",
            Self::TooManyRedirects => "too_many_redirects",
            Self::RedirectNoLocation => "redirect_no_location",
            Self::InvalidUrl => "invalid_url",
        }
    }
}

impl std::fmt::Display for FetchCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("{host} is blocked by the denylist")]
    Denylisted { host: String },
    #[error("{host} is not on the allowlist")]
    NotAllowlisted { host: String },
    #[error("DNS resolution failed for {host}: {reason}")]
    Dns { host: String, reason: String },
    #[error("SSRF blocked: {host} resolves to private IP {ip}")]
    Ssrf { host: String, ip: IpAddr },
    #[error("circuit open for {key}, retry later")]
    CircuitOpen { key: String },
    #[error("rate limit exceeded for {key}, retry in {retry_after_secs}s")]
    RateLimited { key: String, retry_after_secs: u64 },
    #[error("too many redirects (max {max})")]
    TooManyRedirects { max: u8 },
    #[error("redirect without Location header from {url}")]
    RedirectNoLocation { url: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl(message.into())
    }

    #[must_use]
    pub fn code(&self) -> FetchCode {
        match self {
            Self::InvalidUrl(_) => FetchCode::InvalidUrl,
            Self::Denylisted { .. } => FetchCode::DenylistBlocked,
            Self::NotAllowlisted { .. } => FetchCode::AllowlistBlocked,
            Self::Dns { .. } => FetchCode::DnsFailed,
            Self::Ssrf { .. } => FetchCode::SsrfBlocked,
            Self::CircuitOpen { .. } => FetchCode::CircuitOpen,
            Self::RateLimited { .. } => FetchCode::RateLimited,
            Self::TooManyRedirects { .. } => FetchCode::TooManyRedirects,
            Self::RedirectNoLocation { .. } => FetchCode::RedirectNoLocation,
            Self::Transport(_) => FetchCode::ConnectFailed,
        }
    }

    /// Whether this failure says something about the endpoint's health and
    /// should count against its breaker. Policy rejections do not.
    #[must_use]
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::TooManyRedirects { .. } | Self::RedirectNoLocation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
