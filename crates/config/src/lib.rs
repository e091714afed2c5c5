//! Configuration loading, env substitution, and free-text list parsing.
//!
//! Config files: `tollgate.toml`, `tollgate.yaml`, or `tollgate.json`
//! Searched in `./` then `~/.config/tollgate/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod lists;
pub mod loader;
pub mod schema;

pub use {
    lists::{McpServerEntry, parse_domain_list, parse_mcp_servers},
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        BrowseConfig, HttpConfig, McpConfig, ResilienceConfig, SelfCheckConfig, TollgateConfig,
        ToolsConfig,
    },
};
