//! Remote MCP servers reached over HTTP JSON-RPC.

use std::{borrow::Cow, time::Duration};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    tollgate_config::McpServerEntry,
    tollgate_fetch::{FetchClient, FetchRequest},
    tollgate_resilience::Endpoint,
    tracing::debug,
};

use crate::{
    error::{Context, Error, Result},
    params::required_str,
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
    remote::fetch_ok,
};

const MCP_TIMEOUT: Duration = Duration::from_secs(30);
const MCP_MAX_BYTES: usize = 512 * 1024;
const MCP_MAX_PER_WINDOW: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::String(uuid::Uuid::new_v4().to_string()),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolsCallParams<'a> {
    pub name: &'a str,
    pub arguments: Value,
}

/// Per-server policy. The `mcp:<id>` key isolates breaker and quota per server.
fn endpoint_for(server: &McpServerEntry) -> Endpoint {
    Endpoint {
        id: Cow::Owned(format!("mcp:{}", server.id)),
        url: Cow::Owned(server.url.to_string()),
        ttl: Duration::ZERO,
        timeout: MCP_TIMEOUT,
        max_bytes: MCP_MAX_BYTES,
        max_per_window: MCP_MAX_PER_WINDOW,
        follow_redirects: false,
    }
}

fn is_event_stream(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|base| base.trim() == "text/event-stream")
}

/// Pull the first JSON-RPC message out of a `text/event-stream` body.
fn parse_event_stream(body: &str) -> Option<JsonRpcResponse> {
    let mut data = String::new();
    for line in body.lines() {
        let trimmed = line.trim_end();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
            continue;
        }
        if trimmed.is_empty() && !data.is_empty() {
            if let Ok(resp) = serde_json::from_str(&data) {
                return Some(resp);
            }
            data.clear();
        }
    }
    serde_json::from_str(&data).ok()
}

pub struct McpListServersTool {
    servers: Vec<McpServerEntry>,
}

impl McpListServersTool {
    pub fn new(servers: Vec<McpServerEntry>) -> Self {
        Self { servers }
    }
}

#[async_trait]
impl AgentTool for McpListServersTool {
    fn name(&self) -> &str {
        "mcp_list_servers"
    }

    fn description(&self) -> &str {
        "List the configured MCP servers that mcp_call can reach."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Mcp
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn execute(&self, _params: Value) -> Result<Value> {
        let servers: Vec<Value> = self
            .servers
            .iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "url": s.url.as_str(),
                    "authenticated": s.auth_token.is_some(),
                })
            })
            .collect();
        Ok(json!({ "count": servers.len(), "servers": servers }))
    }
}

pub struct McpCallTool {
    client: FetchClient,
    servers: Vec<McpServerEntry>,
}

impl McpCallTool {
    pub fn new(client: FetchClient, servers: Vec<McpServerEntry>) -> Self {
        Self { client, servers }
    }
}

#[async_trait]
impl AgentTool for McpCallTool {
    fn name(&self) -> &str {
        "mcp_call"
    }

    fn description(&self) -> &str {
        "Call a tool on a configured MCP server and return its result."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Mcp
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("server", ParamKind::String, "Server id from mcp_list_servers"),
            ParamSpec::required("tool", ParamKind::String, "Name of the remote tool"),
            ParamSpec::optional("arguments", ParamKind::Object, "Arguments for the remote tool"),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        if self.servers.is_empty() {
            return Err(Error::Disabled("no MCP servers are configured".into()));
        }
        let server_id = required_str(&params, "server")?;
        let tool = required_str(&params, "tool")?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(v @ Value::Object(_)) => v.clone(),
            Some(_) => return Err(Error::invalid_arguments("'arguments' must be an object")),
        };
        let server = self
            .servers
            .iter()
            .find(|s| s.id == server_id)
            .ok_or_else(|| Error::invalid_arguments(format!("unknown MCP server '{server_id}'")))?;

        let call = ToolsCallParams {
            name: tool,
            arguments,
        };
        let rpc = JsonRpcRequest::new("tools/call", Some(serde_json::to_value(&call)?));
        debug!(server = %server.id, tool, "MCP tools/call");

        let endpoint = endpoint_for(server);
        let req = FetchRequest::for_endpoint(&endpoint)
            .with_json_body(serde_json::to_value(&rpc)?)
            .with_bearer_token(server.auth_token.clone());
        let result = fetch_ok(&self.client, &req).await?;

        let resp: JsonRpcResponse = if is_event_stream(result.content_type.as_deref()) {
            parse_event_stream(&result.body)
                .with_context(|| format!("no JSON-RPC message in event stream from '{server_id}'"))?
        } else {
            serde_json::from_str(&result.body)
                .with_context(|| format!("malformed JSON-RPC response from '{server_id}'"))?
        };

        if let Some(err) = resp.error {
            return Err(Error::message(format!(
                "MCP error from '{server_id}': code={} message={}",
                err.code, err.message
            )));
        }
        let result = resp
            .result
            .with_context(|| format!("tools/call on '{server_id}' returned no result"))?;
        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(Error::message(format!(
                "remote tool '{tool}' reported an error: {result}"
            )));
        }
        Ok(json!({ "server": server_id, "tool": tool, "result": result }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::Arc,
        tollgate_config::{BrowseConfig, HttpConfig, parse_mcp_servers},
        tollgate_resilience::ResilienceContext,
    };

    fn client() -> FetchClient {
        FetchClient::new(
            &HttpConfig::default(),
            &BrowseConfig::default(),
            Arc::new(ResilienceContext::default()),
        )
        .unwrap()
    }

    #[test]
    fn event_stream_parsing() {
        let body = "event: message\ndata: {\"id\":\"1\",\"result\":{\"ok\":true}}\n\n";
        let resp = parse_event_stream(body).unwrap();
        assert_eq!(resp.result.unwrap()["ok"], true);
        assert!(parse_event_stream("data: nope\n\n").is_none());
        assert!(is_event_stream(Some("text/event-stream; charset=utf-8")));
        assert!(!is_event_stream(Some("application/json")));
    }

    #[tokio::test]
    async fn list_redacts_tokens() {
        let servers = parse_mcp_servers("files|https://mcp.example.com/rpc|secret-token");
        let out = McpListServersTool::new(servers)
            .execute(json!({}))
            .await
            .unwrap();
        assert_eq!(out["servers"][0]["id"], "files");
        assert_eq!(out["servers"][0]["authenticated"], true);
        assert!(!out.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn call_posts_json_rpc_with_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rpc")
            .match_header("authorization", "Bearer tok")
            .match_body(mockito::Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {"name": "echo", "arguments": {"text": "hi"}}
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":"x","result":{"content":[{"type":"text","text":"hi"}]}}"#)
            .create_async()
            .await;
        let servers = parse_mcp_servers(&format!("local|{}/rpc|tok", server.url()));
        let out = McpCallTool::new(client(), servers)
            .execute(json!({"server": "local", "tool": "echo", "arguments": {"text": "hi"}}))
            .await
            .unwrap();
        assert_eq!(out["result"]["content"][0]["text"], "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn json_rpc_error_is_tool_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rpc")
            .with_body(r#"{"jsonrpc":"2.0","id":"x","error":{"code":-32601,"message":"no such tool"}}"#)
            .create_async()
            .await;
        let servers = parse_mcp_servers(&format!("local|{}/rpc", server.url()));
        let err = McpCallTool::new(client(), servers)
            .execute(json!({"server": "local", "tool": "missing"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "tool_failed");
        assert!(err.to_string().contains("no such tool"));
    }

    #[tokio::test]
    async fn no_servers_means_disabled() {
        let err = McpCallTool::new(client(), Vec::new())
            .execute(json!({"server": "any", "tool": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "disabled");
    }

    #[tokio::test]
    async fn unknown_server_and_bad_arguments() {
        let servers = parse_mcp_servers("known|https://mcp.example.com/rpc");
        let tool = McpCallTool::new(client(), servers);
        let err = tool
            .execute(json!({"server": "nope", "tool": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
        let err = tool
            .execute(json!({"server": "nope", "tool": "x", "arguments": [1]}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }
}
