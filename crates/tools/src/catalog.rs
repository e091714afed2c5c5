use std::sync::Arc;

use {tollgate_config::TollgateConfig, tollgate_fetch::FetchClient};

use crate::{
    approval::InteractionBroker,
    device::{CalendarAddEventTool, DeviceBridge, NotifyTool, ShareTextTool},
    dispatcher::Dispatcher,
    mcp::{McpCallTool, McpListServersTool},
    memory::{MemoryDeleteTool, MemorySaveTool, MemorySearchTool, MemoryStore},
    public_data::PublicDataTool,
    read_file::ReadFileTool,
    registry::ToolRegistry,
    session_state::{SessionStateStore, SessionStateTool},
    web_fetch::WebFetchTool,
};

pub const DEFAULT_SESSION: &str = "main";

/// Register the full tool set in catalog order.
pub fn build_registry(
    config: &TollgateConfig,
    fetch: &FetchClient,
    broker: &Arc<InteractionBroker>,
    device: &Arc<dyn DeviceBridge>,
) -> ToolRegistry {
    let memory = Arc::new(MemoryStore::new());
    let state = Arc::new(SessionStateStore::new());
    let servers = config.mcp.entries();

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(MemorySaveTool::new(Arc::clone(&memory))));
    registry.register(Box::new(MemorySearchTool::new(Arc::clone(&memory))));
    registry.register(Box::new(MemoryDeleteTool::new(memory, Arc::clone(broker))));
    registry.register(Box::new(SessionStateTool::new(state, DEFAULT_SESSION)));
    registry.register(Box::new(WebFetchTool::new(
        fetch.clone(),
        config.browse.clone(),
    )));
    for tool in PublicDataTool::all(fetch) {
        registry.register(Box::new(tool));
    }
    registry.register(Box::new(CalendarAddEventTool::new(
        Arc::clone(device),
        Arc::clone(broker),
    )));
    registry.register(Box::new(ShareTextTool::new(
        Arc::clone(device),
        Arc::clone(broker),
    )));
    registry.register(Box::new(NotifyTool::new(
        Arc::clone(device),
        config.tools.notifications_enabled,
    )));
    registry.register(Box::new(ReadFileTool::new(
        Arc::clone(broker),
        config.tools.max_file_bytes,
    )));
    registry.register(Box::new(McpListServersTool::new(servers.clone())));
    registry.register(Box::new(McpCallTool::new(fetch.clone(), servers)));
    registry
}

/// A dispatcher over the full tool set with a fresh interaction broker.
pub fn build_dispatcher(
    config: &TollgateConfig,
    fetch: &FetchClient,
    device: Arc<dyn DeviceBridge>,
) -> Dispatcher {
    let broker = InteractionBroker::shared(config.tools.approval_timeout());
    let registry = build_registry(config, fetch, &broker, &device);
    Dispatcher::new(registry, config.tools.disabled.iter().cloned(), broker)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::device::HeadlessBridge,
        serde_json::json,
        tollgate_resilience::ResilienceContext,
    };

    fn fetch(config: &TollgateConfig) -> FetchClient {
        FetchClient::new(
            &config.http,
            &config.browse,
            Arc::new(ResilienceContext::from_config(&config.resilience)),
        )
        .unwrap()
    }

    #[test]
    fn catalog_order() {
        let config = TollgateConfig::default();
        let d = build_dispatcher(&config, &fetch(&config), Arc::new(HeadlessBridge));
        let names: Vec<String> = d.catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec![
            "memory_save",
            "memory_search",
            "memory_delete",
            "session_state",
            "web_fetch",
            "weather_forecast",
            "wikipedia_summary",
            "exchange_rates",
            "hacker_news_top",
            "earthquakes_recent",
            "calendar_add_event",
            "share_text",
            "notify",
            "read_file",
            "mcp_list_servers",
            "mcp_call",
        ]);
    }

    #[tokio::test]
    async fn config_disabled_tools_are_refused() {
        let mut config = TollgateConfig::default();
        config.tools.disabled = vec!["memory_save".into()];
        let d = build_dispatcher(&config, &fetch(&config), Arc::new(HeadlessBridge));
        let resp = d
            .invoke("memory_save", json!({"key": "k", "content": "v"}))
            .await;
        assert_eq!(resp.code(), Some("disabled"));
        let resp = d.invoke("memory_search", json!({"query": "k"})).await;
        assert!(resp.ok);
    }
}
