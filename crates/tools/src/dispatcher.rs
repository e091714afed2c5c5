use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use tollgate_metrics::{counter, histogram, labels, tools as tools_metrics};

use crate::{
    approval::InteractionBroker,
    error::Error,
    registry::{ToolDefinition, ToolRegistry},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

/// The `{ok, data?, error?}` envelope returned for every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ToolResponse {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(err: &Error) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody {
                code: err.code().to_string(),
                message: err.to_string(),
                http_status: err.http_status(),
            }),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Maps `(name, arguments)` to a registered tool and runs it in its own task.
pub struct Dispatcher {
    registry: ToolRegistry,
    disabled: HashSet<String>,
    broker: Arc<InteractionBroker>,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        disabled: impl IntoIterator<Item = String>,
        broker: Arc<InteractionBroker>,
    ) -> Self {
        Self {
            registry,
            disabled: disabled.into_iter().collect(),
            broker,
        }
    }

    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.registry.catalog()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn broker(&self) -> &Arc<InteractionBroker> {
        &self.broker
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolResponse {
        self.run(name, arguments, None).await
    }

    /// Like [`invoke`](Self::invoke), but aborts the tool task once
    /// `deadline` elapses and answers `timeout`.
    pub async fn invoke_with_timeout(
        &self,
        name: &str,
        arguments: Value,
        deadline: Duration,
    ) -> ToolResponse {
        self.run(name, arguments, Some(deadline)).await
    }

    async fn run(&self, name: &str, arguments: Value, deadline: Option<Duration>) -> ToolResponse {
        let started = Instant::now();
        let outcome = self.execute(name, arguments, deadline).await;
        let elapsed = started.elapsed();

        let response = match outcome {
            Ok(data) => {
                info!(tool = name, elapsed_ms = elapsed.as_millis() as u64, "tool succeeded");
                ToolResponse::success(data)
            },
            Err(err) => {
                warn!(tool = name, code = err.code(), error = %err, "tool failed");
                ToolResponse::failure(&err)
            },
        };

        #[cfg(feature = "metrics")]
        {
            counter!(
                tools_metrics::EXECUTIONS_TOTAL,
                labels::TOOL => name.to_string(),
                labels::SUCCESS => response.ok.to_string()
            )
            .increment(1);
            histogram!(tools_metrics::EXECUTION_DURATION_SECONDS, labels::TOOL => name.to_string())
                .record(elapsed.as_secs_f64());
            if let Some(code) = response.code() {
                counter!(
                    tools_metrics::EXECUTION_ERRORS_TOTAL,
                    labels::TOOL => name.to_string(),
                    labels::CODE => code.to_string()
                )
                .increment(1);
            }
        }

        response
    }

    async fn execute(
        &self,
        name: &str,
        arguments: Value,
        deadline: Option<Duration>,
    ) -> Result<Value, Error> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        if self.disabled.contains(name) {
            return Err(Error::Disabled(format!("'{name}' is turned off in configuration")));
        }
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            v @ Value::Object(_) => v,
            _ => return Err(Error::invalid_arguments("arguments must be a JSON object")),
        };

        let mut handle = tokio::spawn(async move { tool.execute(arguments).await });
        let joined = match deadline {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    return Err(Error::Timeout(limit));
                },
            },
            None => handle.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(Error::Internal(format!("tool '{name}' panicked"))),
            Err(e) => Err(Error::Internal(format!("tool '{name}' was cancelled: {e}"))),
        }
    }
}
