//! In-process memory store and the `memory_*` tools.

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    serde::Serialize,
    serde_json::{Value, json},
    tokio::sync::RwLock,
    tracing::info,
};

use crate::{
    approval::InteractionBroker,
    error::{Error, Result},
    params::{optional_limit, required_str},
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
};

#[derive(Debug, Clone, Serialize)]
pub struct MemoryEntry {
    pub key: String,
    pub content: String,
    /// Seconds since the Unix epoch.
    pub updated_at: u64,
}

/// Key/content notes that live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns `true` if the key already existed.
    pub async fn save(&self, key: &str, content: &str) -> bool {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.entries
            .write()
            .await
            .insert(key.to_string(), MemoryEntry {
                key: key.to_string(),
                content: content.to_string(),
                updated_at,
            })
            .is_some()
    }

    /// Case-insensitive substring match over keys and content.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<MemoryEntry> {
        let needle = query.to_lowercase();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| {
                e.key.to_lowercase().contains(&needle) || e.content.to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

pub struct MemorySaveTool {
    store: Arc<MemoryStore>,
}

impl MemorySaveTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AgentTool for MemorySaveTool {
    fn name(&self) -> &str {
        "memory_save"
    }

    fn description(&self) -> &str {
        "Save a note under a key so it can be recalled later. Saving to an existing key replaces it."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Memory
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("key", ParamKind::String, "Short identifier for the note"),
            ParamSpec::required("content", ParamKind::String, "Text to remember"),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let key = required_str(&params, "key")?.trim();
        let content = required_str(&params, "content")?;
        let replaced = self.store.save(key, content).await;
        Ok(json!({ "key": key, "replaced": replaced }))
    }
}

pub struct MemorySearchTool {
    store: Arc<MemoryStore>,
}

impl MemorySearchTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AgentTool for MemorySearchTool {
    fn name(&self) -> &str {
        "memory_search"
    }

    fn description(&self) -> &str {
        "Search saved notes by a case-insensitive substring of the key or content."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Memory
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("query", ParamKind::String, "Text to look for"),
            ParamSpec::optional("limit", ParamKind::Integer, "Maximum results (default 10)"),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let query = required_str(&params, "query")?;
        let limit = optional_limit(&params, "limit", 10, 100)? as usize;
        let results = self.store.search(query, limit).await;
        Ok(json!({ "count": results.len(), "results": results }))
    }
}

/// Deleting a note needs the user's consent.
pub struct MemoryDeleteTool {
    store: Arc<MemoryStore>,
    broker: Arc<InteractionBroker>,
}

impl MemoryDeleteTool {
    pub fn new(store: Arc<MemoryStore>, broker: Arc<InteractionBroker>) -> Self {
        Self { store, broker }
    }
}

#[async_trait]
impl AgentTool for MemoryDeleteTool {
    fn name(&self) -> &str {
        "memory_delete"
    }

    fn description(&self) -> &str {
        "Delete a saved note. The user is asked to confirm first."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Memory
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "key",
            ParamKind::String,
            "Identifier of the note to delete",
        )]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let key = required_str(&params, "key")?.trim();
        let decision = self
            .broker
            .request_approval(self.name(), &format!("Delete the saved note '{key}'"))
            .await;
        if !decision.is_approved() {
            return Err(Error::UserDenied(format!("deleting note '{key}'")));
        }
        let deleted = self.store.delete(key).await;
        info!(key, deleted, "memory note deleted");
        Ok(json!({ "key": key, "deleted": deleted }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[tokio::test]
    async fn save_search_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let save = MemorySaveTool::new(Arc::clone(&store));
        let search = MemorySearchTool::new(Arc::clone(&store));

        let out = save
            .execute(json!({"key": "wifi", "content": "Password is Hunter2"}))
            .await
            .unwrap();
        assert_eq!(out["replaced"], false);
        save.execute(json!({"key": "dentist", "content": "Tuesday 3pm"}))
            .await
            .unwrap();

        let out = search.execute(json!({"query": "HUNTER"})).await.unwrap();
        assert_eq!(out["count"], 1);
        assert_eq!(out["results"][0]["key"], "wifi");

        let out = search
            .execute(json!({"query": "", "limit": 1}))
            .await
            .unwrap_err();
        assert!(matches!(out, Error::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn delete_requires_approval() {
        let store = Arc::new(MemoryStore::new());
        store.save("k", "v").await;
        let broker = InteractionBroker::shared(Duration::from_secs(5));
        let tool = Arc::new(MemoryDeleteTool::new(Arc::clone(&store), Arc::clone(&broker)));

        let t = Arc::clone(&tool);
        let denied = tokio::spawn(async move { t.execute(json!({"key": "k"})).await });
        let pending = loop {
            if let Some(p) = broker.pending_approvals().pop() {
                break p;
            }
            tokio::task::yield_now().await;
        };
        assert!(pending.summary.contains("'k'"));
        broker.respond_approval(&pending.id, false);
        let err = denied.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "user_denied");
        assert_eq!(store.len().await, 1);

        let t = Arc::clone(&tool);
        let granted = tokio::spawn(async move { t.execute(json!({"key": "k"})).await });
        let pending = loop {
            if let Some(p) = broker.pending_approvals().pop() {
                break p;
            }
            tokio::task::yield_now().await;
        };
        broker.respond_approval(&pending.id, true);
        let out = granted.await.unwrap().unwrap();
        assert_eq!(out["deleted"], true);
        assert_eq!(store.len().await, 0);
    }
}
