use std::time::Duration;

use {
    serde::{Serialize, Serializer},
    tollgate_resilience::CachedResponse,
};

use crate::error::{Error, FetchCode};

/// Outcome of one orchestrated fetch. Returned to the caller and never
/// stored; the cache keeps only the body, its content type and the cap it
/// was truncated at.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub ok: bool,
    /// Absent on a network success; `cached` on a cache hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<FetchCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    pub truncated: bool,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl FetchResult {
    pub(crate) fn cached(hit: CachedResponse, latency: Duration) -> Self {
        let truncated = hit.is_truncated();
        let CachedResponse {
            body, content_type, ..
        } = hit;
        Self {
            ok: true,
            code: Some(FetchCode::Cached),
            message: None,
            http_status: None,
            final_url: None,
            body,
            content_type,
            latency,
            truncated,
        }
    }

    pub(crate) fn rejected(err: &Error, latency: Duration) -> Self {
        Self {
            ok: false,
            code: Some(err.code()),
            message: Some(err.to_string()),
            http_status: None,
            final_url: None,
            body: String::new(),
            content_type: None,
            latency,
            truncated: false,
        }
    }

    /// The failure category, if any. Cache hits are successes.
    #[must_use]
    pub fn failure_code(&self) -> Option<FetchCode> {
        if self.ok { None } else { self.code }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}
