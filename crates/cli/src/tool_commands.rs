use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    serde_json::{Value, json},
    tracing::info,
};

use {
    tollgate_config::TollgateConfig,
    tollgate_fetch::FetchClient,
    tollgate_resilience::{ENDPOINTS, ResilienceContext},
    tollgate_selfcheck::{SelfCheck, render_table, summarize},
    tollgate_tools::{Dispatcher, HeadlessBridge, InteractionBroker},
};

const PROMPT_POLL: Duration = Duration::from_millis(50);

/// How prompts raised during `invoke` are answered.
pub struct Answers {
    pub approve: bool,
    pub file: Option<PathBuf>,
}

fn dispatcher(config: &TollgateConfig) -> Result<Dispatcher> {
    let resilience = Arc::new(ResilienceContext::from_config(&config.resilience));
    let fetch = FetchClient::new(&config.http, &config.browse, resilience)
        .context("failed to build the HTTP client")?;
    Ok(tollgate_tools::build_dispatcher(
        config,
        &fetch,
        Arc::new(HeadlessBridge),
    ))
}

pub fn list_tools(config: &TollgateConfig, json: bool) -> Result<ExitCode> {
    let dispatcher = dispatcher(config)?;

    if json {
        let schemas = dispatcher.registry().list_schemas();
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(ExitCode::SUCCESS);
    }

    for def in dispatcher.catalog() {
        let state = if config.tools.is_disabled(&def.name) {
            "disabled"
        } else {
            ""
        };
        println!(
            "{:<20} {:<14} {:<8} {}",
            def.name,
            def.group.as_str(),
            state,
            def.description
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn list_endpoints() -> Result<ExitCode> {
    println!(
        "{:<20} {:>7} {:>8} {:>9} {:>7} {:<9} URL",
        "ID", "TTL", "TIMEOUT", "MAX_BYTES", "QUOTA", "REDIRECTS"
    );
    for ep in ENDPOINTS {
        println!(
            "{:<20} {:>6}s {:>7}s {:>9} {:>7} {:<9} {}",
            ep.id,
            ep.ttl.as_secs(),
            ep.timeout.as_secs(),
            ep.max_bytes,
            ep.max_per_window,
            if ep.follow_redirects { "follow" } else { "no" },
            ep.url
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn invoke(
    config: &TollgateConfig,
    name: &str,
    args: &str,
    answers: Answers,
    timeout_secs: Option<u64>,
) -> Result<ExitCode> {
    let arguments: Value =
        serde_json::from_str(args).with_context(|| format!("--args is not valid JSON: {args}"))?;
    let dispatcher = dispatcher(config)?;

    let responder = tokio::spawn(answer_prompts(Arc::clone(dispatcher.broker()), answers));
    let response = match timeout_secs {
        Some(secs) => {
            dispatcher
                .invoke_with_timeout(name, arguments, Duration::from_secs(secs))
                .await
        },
        None => dispatcher.invoke(name, arguments).await,
    };
    responder.abort();

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn answer_prompts(broker: Arc<InteractionBroker>, answers: Answers) {
    let mut tick = tokio::time::interval(PROMPT_POLL);
    loop {
        tick.tick().await;
        for prompt in broker.pending_approvals() {
            info!(
                tool = %prompt.tool,
                summary = %prompt.summary,
                granted = answers.approve,
                "answering approval"
            );
            broker.respond_approval(&prompt.id, answers.approve);
        }
        for pick in broker.pending_file_picks() {
            info!(
                tool = %pick.tool,
                purpose = %pick.purpose,
                picked = answers.file.is_some(),
                "answering file pick"
            );
            broker.respond_file_pick(&pick.id, answers.file.clone());
        }
    }
}

pub async fn self_check(
    config: &TollgateConfig,
    timeout_secs: Option<u64>,
    json: bool,
) -> Result<ExitCode> {
    let dispatcher = dispatcher(config)?;
    let per_tool = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.self_check.per_tool_timeout());

    let rows = SelfCheck::new(&dispatcher, per_tool).run().await;
    let summary = summarize(&rows);

    if json {
        let report = json!({ "rows": rows, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_table(&rows));
    }

    Ok(if summary.all_passed_or_skipped() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
