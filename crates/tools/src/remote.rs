use {
    serde_json::Value,
    tollgate_fetch::{FetchClient, FetchRequest, FetchResult},
};

use crate::error::{Context, Error, Result};

/// Run a fetch and turn any non-ok outcome into a tool error.
pub(crate) async fn fetch_ok(client: &FetchClient, req: &FetchRequest<'_>) -> Result<FetchResult> {
    let result = client.fetch(req).await;
    if result.ok {
        Ok(result)
    } else {
        Err(Error::from_fetch(&result))
    }
}

pub(crate) async fn fetch_json(client: &FetchClient, req: &FetchRequest<'_>) -> Result<Value> {
    let result = fetch_ok(client, req).await?;
    result
        .json()
        .with_context(|| format!("{} returned malformed JSON", req.endpoint.id))
}
