use std::{path::Path, process::ExitCode};

use {
    anyhow::Result,
    clap::Subcommand,
    serde_json::Value,
};

use tollgate_config::TollgateConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration with MCP tokens redacted.
    Show,
    /// Print where configuration files are looked up.
    Path,
}

/// An explicit `--config` must load; otherwise discovery falls back to defaults.
pub fn resolve(explicit: Option<&Path>) -> Result<TollgateConfig> {
    match explicit {
        Some(path) => tollgate_config::load_config(path),
        None => Ok(tollgate_config::discover_and_load()),
    }
}

pub fn handle_config(
    action: ConfigAction,
    config: &TollgateConfig,
    explicit: Option<&Path>,
) -> Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&redacted(config)?)?);
        },
        ConfigAction::Path => {
            if let Some(path) = explicit {
                println!("{}", path.display());
            } else {
                println!("./tollgate.{{toml,yaml,yml,json}}");
                if let Some(dir) = tollgate_config::config_dir() {
                    println!("{}/tollgate.{{toml,yaml,yml,json}}", dir.display());
                }
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn redacted(config: &TollgateConfig) -> Result<Value> {
    let mut value = serde_json::to_value(config)?;
    let servers: Vec<String> = config
        .mcp
        .entries()
        .iter()
        .map(|entry| match entry.auth_token {
            Some(_) => format!("{}|{}|[REDACTED]", entry.id, entry.url),
            None => format!("{}|{}", entry.id, entry.url),
        })
        .collect();
    if let Some(mcp) = value.get_mut("mcp").and_then(Value::as_object_mut) {
        mcp.insert("servers".into(), Value::String(servers.join("\n")));
    }
    Ok(value)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    #[test]
    fn show_redacts_mcp_tokens() {
        let mut config = TollgateConfig::default();
        config.mcp.servers =
            "# team servers\nalpha|https://mcp.example.com/rpc|s3cret\nbeta|https://other.example.com/"
                .into();

        let value = redacted(&config).unwrap();
        let servers = value["mcp"]["servers"].as_str().unwrap();
        assert!(!servers.contains("s3cret"));
        assert_eq!(
            servers,
            "alpha|https://mcp.example.com/rpc|[REDACTED]\nbeta|https://other.example.com/"
        );
        assert_eq!(value["tools"]["approval_timeout_seconds"], 120);
    }

    #[test]
    fn explicit_config_is_loaded() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[tools]\ndisabled = [\"notify\"]").unwrap();

        let config = resolve(Some(file.path())).unwrap();
        assert!(config.tools.is_disabled("notify"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
