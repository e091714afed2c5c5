use std::path::{Path, PathBuf};

use {
    anyhow::{Context, bail},
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::TollgateConfig};

const FILE_STEM: &str = "tollgate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    /// Discovery order within one directory.
    const SEARCH: [(&'static str, Self); 4] = [
        ("toml", Self::Toml),
        ("yaml", Self::Yaml),
        ("yml", Self::Yaml),
        ("json", Self::Json),
    ];

    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::SEARCH
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
            .map(|(_, format)| *format)
    }

    fn parse(self, raw: &str) -> anyhow::Result<TollgateConfig> {
        Ok(match self {
            Self::Toml => toml::from_str(raw)?,
            Self::Yaml => serde_yaml::from_str(raw)?,
            Self::Json => serde_json::from_str(raw)?,
        })
    }
}

/// Load config from `path`, picking the parser from its extension.
///
/// `${ENV_VAR}` placeholders are expanded before parsing.
pub fn load_config(path: &Path) -> anyhow::Result<TollgateConfig> {
    let Some(format) = Format::of(path) else {
        bail!("unsupported config format: {}", path.display());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    format
        .parse(&substitute_env(&raw))
        .with_context(|| format!("invalid config in {}", path.display()))
}

/// Load the first config file found in `./`, then in [`config_dir`].
///
/// A missing or unparseable file yields `TollgateConfig::default()`; the
/// parse failure is logged.
pub fn discover_and_load() -> TollgateConfig {
    let Some(path) = candidates().into_iter().find(|p| p.is_file()) else {
        debug!("no config file found, using defaults");
        return TollgateConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(
            path = %path.display(),
            error = %format!("{e:#}"),
            "failed to load config, using defaults"
        );
        TollgateConfig::default()
    })
}

/// Every path discovery would try, in order.
fn candidates() -> Vec<PathBuf> {
    let dirs = std::iter::once(PathBuf::from(".")).chain(config_dir());
    dirs.flat_map(|dir| {
        Format::SEARCH
            .iter()
            .map(move |(ext, _)| dir.join(format!("{FILE_STEM}.{ext}")))
    })
    .collect()
}

/// The user-global config directory (`~/.config/tollgate/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", FILE_STEM).map(|d| d.config_dir().to_path_buf())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        std::fs::write(
            &path,
            "[resilience]\nbreaker_threshold = 5\n\n[tools]\ndisabled = [\"notify\"]\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.resilience.breaker_threshold, 5);
        assert!(cfg.tools.is_disabled("notify"));
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.yaml");
        std::fs::write(
            &path,
            "browse:\n  allow_domains: |\n    example.com\n    wikipedia.org\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.browse.allowlist(), vec!["example.com", "wikipedia.org"]);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.json");
        std::fs::write(&path, r#"{"self_check": {"per_tool_timeout_seconds": 3}}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.self_check.per_tool_timeout_seconds, 3);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        std::fs::write(&path, "[tools\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("tollgate.toml"));
    }

    #[test]
    fn expands_env_placeholders_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        std::fs::write(&path, "[http]\nuser_agent = \"${TOLLGATE_UNSET_FOR_TEST}\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.http.user_agent, "${TOLLGATE_UNSET_FOR_TEST}");
    }

    #[test]
    fn candidates_start_in_working_directory() {
        let paths = candidates();
        assert_eq!(paths[0], PathBuf::from("./tollgate.toml"));
        assert_eq!(paths[2], PathBuf::from("./tollgate.yml"));
        assert!(paths.len() >= 4);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.toml")).is_err());
    }
}
