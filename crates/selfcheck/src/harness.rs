use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use {
    serde_json::{Map, Value, json},
    tokio::time::MissedTickBehavior,
    tracing::{debug, info, warn},
};

use tollgate_tools::{Dispatcher, ParamKind, ToolDefinition};

use crate::report::{CheckStatus, SelfCheckRow};

/// Error codes that mean "could not run unattended" rather than "broken".
const SOFT_CODES: [&str; 4] = [
    "disabled",
    "user_denied",
    "permission_denied",
    "user_canceled",
];

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct SelfCheck<'a> {
    dispatcher: &'a Dispatcher,
    per_tool_timeout: Duration,
    poll_interval: Duration,
}

impl<'a> SelfCheck<'a> {
    pub fn new(dispatcher: &'a Dispatcher, per_tool_timeout: Duration) -> Self {
        Self {
            dispatcher,
            per_tool_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How often pending prompts are swept while a tool runs.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Invokes every distinct tool once, in catalog order.
    pub async fn run(&self) -> Vec<SelfCheckRow> {
        let catalog = self.dispatcher.catalog();
        info!(
            tools = catalog.len(),
            timeout_ms = self.per_tool_timeout.as_millis() as u64,
            "self-check started"
        );

        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(catalog.len());
        for def in &catalog {
            if !seen.insert(def.name.as_str()) {
                continue;
            }
            rows.push(self.check(def).await);
        }
        rows
    }

    async fn check(&self, def: &ToolDefinition) -> SelfCheckRow {
        let arguments = synthesize_arguments(def);
        debug!(tool = %def.name, %arguments, "self-check invoking");

        let started = Instant::now();
        let invocation = self
            .dispatcher
            .invoke_with_timeout(&def.name, arguments, self.per_tool_timeout);
        tokio::pin!(invocation);

        let mut sweep = tokio::time::interval(self.poll_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let response = loop {
            tokio::select! {
                response = &mut invocation => break response,
                _ = sweep.tick() => self.dismiss_prompts(),
            }
        };
        let elapsed = started.elapsed();

        let (status, detail) = classify(&response.to_value());
        match status {
            CheckStatus::Fail => warn!(tool = %def.name, %detail, "self-check failed"),
            _ => info!(
                tool = %def.name,
                %status,
                elapsed_ms = elapsed.as_millis() as u64,
                "self-check"
            ),
        }
        SelfCheckRow {
            tool: def.name.clone(),
            status,
            elapsed,
            detail,
        }
    }

    fn dismiss_prompts(&self) {
        let broker = self.dispatcher.broker();
        for prompt in broker.pending_approvals() {
            if broker.respond_approval(&prompt.id, false) {
                debug!(tool = %prompt.tool, id = %prompt.id, "approval denied");
            }
        }
        for pick in broker.pending_file_picks() {
            if broker.respond_file_pick(&pick.id, None) {
                debug!(tool = %pick.tool, id = %pick.id, "file pick canceled");
            }
        }
    }
}

/// Placeholder arguments covering only the required parameters.
#[must_use]
pub fn synthesize_arguments(def: &ToolDefinition) -> Value {
    let args: Map<String, Value> = def
        .parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| (p.name.to_string(), placeholder(&def.name, p.name, p.kind)))
        .collect();
    Value::Object(args)
}

fn placeholder(tool: &str, name: &str, kind: ParamKind) -> Value {
    match (tool, name) {
        (_, "latitude") => json!(52.52),
        (_, "longitude") => json!(13.41),
        ("wikipedia_summary", "title") => json!("Rust (programming language)"),
        (_, "base") => json!("USD"),
        (_, "url") => json!("https://example.com/"),
        ("session_state", "operation") => json!("list"),
        (_, "start") => json!("2000-01-01T00:00:00"),
        _ => match kind {
            ParamKind::String => json!("selfcheck"),
            ParamKind::Number => json!(0),
            ParamKind::Integer => json!(1),
            ParamKind::Object => json!({}),
        },
    }
}

/// Maps an invocation envelope to a status and a one-line detail.
#[must_use]
pub fn classify(envelope: &Value) -> (CheckStatus, String) {
    match envelope.get("ok").and_then(Value::as_bool) {
        Some(true) => (CheckStatus::Pass, "ok".into()),
        Some(false) => {
            let error = envelope.get("error");
            let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);
            let message = error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            match code {
                Some(code) if SOFT_CODES.contains(&code) => {
                    (CheckStatus::Skip, format!("{code}: {message}"))
                },
                Some(code) => (CheckStatus::Fail, format!("{code}: {message}")),
                None => (CheckStatus::Fail, "malformed response: no error code".into()),
            }
        },
        None => (CheckStatus::Fail, "malformed response: no ok flag".into()),
    }
}
