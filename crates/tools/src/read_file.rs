use std::sync::Arc;

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tokio::io::AsyncReadExt,
    tracing::debug,
};

use crate::{
    approval::{FilePick, InteractionBroker},
    error::{Context, Error, Result},
    params::optional_str,
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
};

/// Reads a file the user picks. The model never supplies a path.
pub struct ReadFileTool {
    broker: Arc<InteractionBroker>,
    max_bytes: usize,
}

impl ReadFileTool {
    pub fn new(broker: Arc<InteractionBroker>, max_bytes: usize) -> Self {
        Self { broker, max_bytes }
    }
}

#[async_trait]
impl AgentTool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Ask the user to pick a file and return its text content."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Device
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional(
            "purpose",
            ParamKind::String,
            "Why the file is needed; shown to the user",
        )]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let purpose = optional_str(&params, "purpose")?.unwrap_or("");
        let path = match self.broker.request_file_pick(self.name(), purpose).await {
            FilePick::Picked(path) => path,
            FilePick::Canceled => return Err(Error::UserCanceled),
        };
        debug!(path = %path.display(), "reading picked file");

        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        let mut buf = Vec::new();
        file.take(self.max_bytes as u64 + 1)
            .read_to_end(&mut buf)
            .await?;
        let truncated = buf.len() > self.max_bytes;
        buf.truncate(self.max_bytes);

        let content = String::from_utf8_lossy(&buf).into_owned();
        Ok(json!({
            "path": path.display().to_string(),
            "name": path.file_name().map(|n| n.to_string_lossy().into_owned()),
            "bytes": buf.len(),
            "truncated": truncated,
            "content": content,
        }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{io::Write, time::Duration},
    };

    async fn answer_pick(broker: &InteractionBroker, path: Option<std::path::PathBuf>) {
        let pending = loop {
            if let Some(p) = broker.pending_file_picks().pop() {
                break p;
            }
            tokio::task::yield_now().await;
        };
        broker.respond_file_pick(&pending.id, path);
    }

    #[tokio::test]
    async fn reads_picked_file_with_cap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        let broker = InteractionBroker::shared(Duration::from_secs(5));
        let tool = ReadFileTool::new(Arc::clone(&broker), 5);

        let task = tokio::spawn(async move { tool.execute(json!({"purpose": "notes"})).await });
        answer_pick(&broker, Some(file.path().to_path_buf())).await;
        let out = task.await.unwrap().unwrap();
        assert_eq!(out["content"], "hello");
        assert_eq!(out["truncated"], true);
        assert_eq!(out["bytes"], 5);
    }

    #[tokio::test]
    async fn canceled_pick() {
        let broker = InteractionBroker::shared(Duration::from_secs(5));
        let tool = ReadFileTool::new(Arc::clone(&broker), 1024);
        let task = tokio::spawn(async move { tool.execute(json!({})).await });
        answer_pick(&broker, None).await;
        assert_eq!(task.await.unwrap().unwrap_err().code(), "user_canceled");
    }

    #[tokio::test]
    async fn missing_file_is_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let broker = InteractionBroker::shared(Duration::from_secs(5));
        let tool = ReadFileTool::new(Arc::clone(&broker), 1024);
        let task = tokio::spawn(async move { tool.execute(json!({})).await });
        answer_pick(&broker, Some(dir.path().join("absent.txt"))).await;
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "tool_failed");
        assert!(err.to_string().contains("absent.txt"));
    }
}
