//! Agent tool for per-session key-value state.
//!
//! State is scoped by session key so one process can serve several
//! conversations. A caller may pass `_session_key` to pick the scope;
//! otherwise the tool's default session is used.

use std::{collections::BTreeMap, sync::Arc};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tokio::sync::RwLock,
};

use crate::{
    error::{Error, Result},
    params::{optional_str, required_str},
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
};

/// In-memory `(session, key) -> value` store.
#[derive(Debug, Default)]
pub struct SessionStateStore {
    entries: RwLock<BTreeMap<(String, String), String>>,
}

impl SessionStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, session: &str, key: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(&(session.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn set(&self, session: &str, key: &str, value: &str) {
        self.entries
            .write()
            .await
            .insert((session.to_string(), key.to_string()), value.to_string());
    }

    pub async fn delete(&self, session: &str, key: &str) -> bool {
        self.entries
            .write()
            .await
            .remove(&(session.to_string(), key.to_string()))
            .is_some()
    }

    /// Entries of one session, ordered by key.
    pub async fn list(&self, session: &str) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|((s, _), _)| s == session)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn delete_all(&self, session: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(s, _), _| s != session);
        before - entries.len()
    }
}

fn key_param<'a>(params: &'a Value, operation: &str) -> Result<&'a str> {
    optional_str(params, "key")?
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::invalid_arguments(format!("'{operation}' requires 'key'")))
}

/// Agent tool exposing per-session key-value state operations.
pub struct SessionStateTool {
    store: Arc<SessionStateStore>,
    default_session: String,
}

impl SessionStateTool {
    pub fn new(store: Arc<SessionStateStore>, default_session: impl Into<String>) -> Self {
        Self {
            store,
            default_session: default_session.into(),
        }
    }
}

#[async_trait]
impl AgentTool for SessionStateTool {
    fn name(&self) -> &str {
        "session_state"
    }

    fn description(&self) -> &str {
        "Persist and retrieve key-value state scoped to the current session. \
         Operations: get, set, delete, list, clear."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Session
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required(
                "operation",
                ParamKind::String,
                "One of get, set, delete, list, clear",
            ),
            ParamSpec::optional("key", ParamKind::String, "The key (get, set, delete)"),
            ParamSpec::optional("value", ParamKind::String, "The value to store (set)"),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let operation = required_str(&params, "operation")?;
        let session = optional_str(&params, "_session_key")?.unwrap_or(&self.default_session);

        match operation {
            "get" => {
                let value = self.store.get(session, key_param(&params, operation)?).await;
                Ok(json!({ "value": value }))
            },
            "set" => {
                let key = key_param(&params, operation)?;
                let value = optional_str(&params, "value")?
                    .ok_or_else(|| Error::invalid_arguments("'set' requires 'value'"))?;
                self.store.set(session, key, value).await;
                Ok(json!({ "ok": true }))
            },
            "delete" => {
                let deleted = self.store.delete(session, key_param(&params, operation)?).await;
                Ok(json!({ "deleted": deleted }))
            },
            "list" => {
                let items: Vec<Value> = self
                    .store
                    .list(session)
                    .await
                    .into_iter()
                    .map(|(key, value)| json!({ "key": key, "value": value }))
                    .collect();
                Ok(json!({ "entries": items }))
            },
            "clear" => {
                let count = self.store.delete_all(session).await;
                Ok(json!({ "deleted": count }))
            },
            _ => Err(Error::invalid_arguments(format!(
                "unknown operation: {operation}"
            ))),
        }
    }
}
