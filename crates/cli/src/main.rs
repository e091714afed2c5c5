mod config_commands;
mod tool_commands;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tollgate", about = "Tollgate: guarded tool invocation for LLM agents", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of the discovered one.
    #[arg(long, global = true, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tool catalog in dispatch order.
    Tools {
        /// Print JSON schemas instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// List the compiled-in remote endpoints and their policies.
    Endpoints,
    /// Invoke a single tool and print its response envelope.
    Invoke {
        /// Tool name, as shown by `tollgate tools`.
        name: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Grant approval prompts instead of denying them.
        #[arg(long)]
        approve: bool,
        /// Answer file-pick prompts with this path instead of canceling.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Abort the tool after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run every tool once, unattended, and report PASS / SKIP / FAIL.
    SelfCheck {
        /// Per-tool deadline (overrides `self_check.per_tool_timeout_seconds`).
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print rows and summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tollgate starting");

    let config = config_commands::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Tools { json } => tool_commands::list_tools(&config, json),
        Commands::Endpoints => tool_commands::list_endpoints(),
        Commands::Invoke {
            name,
            args,
            approve,
            file,
            timeout_secs,
        } => {
            let answers = tool_commands::Answers { approve, file };
            tool_commands::invoke(&config, &name, &args, answers, timeout_secs).await
        },
        Commands::SelfCheck { timeout_secs, json } => {
            tool_commands::self_check(&config, timeout_secs, json).await
        },
        Commands::Config { action } => {
            config_commands::handle_config(action, &config, cli.config.as_deref())
        },
    }
}
