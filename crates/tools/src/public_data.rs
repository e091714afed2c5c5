//! Tools backed by the compiled-in public-data endpoints. Each tool is
//! named after the endpoint it calls.

use std::borrow::Cow;

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tollgate_fetch::{FetchClient, FetchRequest},
    tollgate_resilience::Endpoint,
};

use crate::{
    error::{Error, Result},
    params::{optional_limit, required_f64, required_str},
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
    remote::fetch_json,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Weather,
    Wikipedia,
    ExchangeRates,
    HackerNews,
    Earthquakes,
}

impl Kind {
    const ALL: [Self; 5] = [
        Self::Weather,
        Self::Wikipedia,
        Self::ExchangeRates,
        Self::HackerNews,
        Self::Earthquakes,
    ];

    fn endpoint_id(self) -> &'static str {
        match self {
            Self::Weather => "weather_forecast",
            Self::Wikipedia => "wikipedia_summary",
            Self::ExchangeRates => "exchange_rates",
            Self::HackerNews => "hacker_news_top",
            Self::Earthquakes => "earthquakes_recent",
        }
    }
}

pub struct PublicDataTool {
    client: FetchClient,
    endpoint: Endpoint,
    kind: Kind,
}

impl PublicDataTool {
    /// One tool per public-data endpoint, in catalog order.
    pub fn all(client: &FetchClient) -> Vec<Self> {
        Kind::ALL
            .into_iter()
            .filter_map(|kind| {
                Endpoint::lookup(kind.endpoint_id()).map(|endpoint| Self {
                    client: client.clone(),
                    endpoint: endpoint.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Point the tool at a different URL, keeping the endpoint's policy.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint.url = Cow::Owned(url.into());
        self
    }

    async fn weather(&self, params: &Value) -> Result<Value> {
        let latitude = required_f64(params, "latitude")?;
        let longitude = required_f64(params, "longitude")?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::invalid_arguments("'latitude' must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::invalid_arguments("'longitude' must be between -180 and 180"));
        }
        let (lat, lon) = (format!("{latitude:.4}"), format!("{longitude:.4}"));
        let req = FetchRequest::templated(&self.endpoint, &[("latitude", &lat), ("longitude", &lon)]);
        let body = fetch_json(&self.client, &req).await?;
        Ok(json!({
            "latitude": latitude,
            "longitude": longitude,
            "current": body.get("current_weather").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn wikipedia(&self, params: &Value) -> Result<Value> {
        let title = required_str(params, "title")?.trim().replace(' ', "_");
        let req = FetchRequest::templated(&self.endpoint, &[("title", &title)]);
        let body = fetch_json(&self.client, &req).await?;
        Ok(json!({
            "title": body.get("title").cloned().unwrap_or_else(|| json!(title)),
            "description": body.get("description").cloned().unwrap_or(Value::Null),
            "extract": body.get("extract").cloned().unwrap_or(Value::Null),
            "url": body.pointer("/content_urls/desktop/page").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn exchange_rates(&self, params: &Value) -> Result<Value> {
        let base = required_str(params, "base")?.trim().to_ascii_uppercase();
        if base.len() != 3 || !base.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::invalid_arguments(
                "'base' must be a three-letter currency code",
            ));
        }
        let req = FetchRequest::templated(&self.endpoint, &[("base", &base)]);
        let body = fetch_json(&self.client, &req).await?;
        if body.get("result").and_then(Value::as_str) == Some("error") {
            let kind = body
                .get("error-type")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(Error::message(format!("exchange rate lookup failed: {kind}")));
        }
        Ok(json!({
            "base": base,
            "updated": body.get("time_last_update_utc").cloned().unwrap_or(Value::Null),
            "rates": body.get("rates").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn hacker_news(&self, params: &Value) -> Result<Value> {
        let limit = optional_limit(params, "limit", 10, 50)? as usize;
        let body = fetch_json(&self.client, &FetchRequest::for_endpoint(&self.endpoint)).await?;
        let ids: Vec<Value> = body
            .as_array()
            .ok_or_else(|| Error::message("unexpected Hacker News response"))?
            .iter()
            .take(limit)
            .cloned()
            .collect();
        Ok(json!({ "count": ids.len(), "ids": ids }))
    }

    async fn earthquakes(&self) -> Result<Value> {
        let body = fetch_json(&self.client, &FetchRequest::for_endpoint(&self.endpoint)).await?;
        let quakes: Vec<Value> = body
            .get("features")
            .and_then(Value::as_array)
            .map(|features| {
                features
                    .iter()
                    .take(20)
                    .map(|f| {
                        json!({
                            "magnitude": f.pointer("/properties/mag").cloned().unwrap_or(Value::Null),
                            "place": f.pointer("/properties/place").cloned().unwrap_or(Value::Null),
                            "time": f.pointer("/properties/time").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "count": quakes.len(), "earthquakes": quakes }))
    }
}

#[async_trait]
impl AgentTool for PublicDataTool {
    fn name(&self) -> &str {
        &self.endpoint.id
    }

    fn description(&self) -> &str {
        match self.kind {
            Kind::Weather => "Current weather for a latitude/longitude from Open-Meteo.",
            Kind::Wikipedia => "Short summary of a Wikipedia article by title.",
            Kind::ExchangeRates => "Latest currency exchange rates for a base currency.",
            Kind::HackerNews => "Ids of the current top Hacker News stories.",
            Kind::Earthquakes => "Earthquakes recorded worldwide in the past hour (USGS).",
        }
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::PublicData
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        match self.kind {
            Kind::Weather => vec![
                ParamSpec::required("latitude", ParamKind::Number, "Latitude in degrees"),
                ParamSpec::required("longitude", ParamKind::Number, "Longitude in degrees"),
            ],
            Kind::Wikipedia => vec![ParamSpec::required(
                "title",
                ParamKind::String,
                "Article title",
            )],
            Kind::ExchangeRates => vec![ParamSpec::required(
                "base",
                ParamKind::String,
                "ISO 4217 currency code, e.g. USD",
            )],
            Kind::HackerNews => vec![ParamSpec::optional(
                "limit",
                ParamKind::Integer,
                "Number of stories (default 10, max 50)",
            )],
            Kind::Earthquakes => Vec::new(),
        }
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        match self.kind {
            Kind::Weather => self.weather(&params).await,
            Kind::Wikipedia => self.wikipedia(&params).await,
            Kind::ExchangeRates => self.exchange_rates(&params).await,
            Kind::HackerNews => self.hacker_news(&params).await,
            Kind::Earthquakes => self.earthquakes().await,
        }
    }
}
