//! Typed configuration schema. Every section is `#[serde(default)]`, so a
//! partial file (or none at all) yields a working configuration.

use std::time::Duration;

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::lists::{McpServerEntry, parse_domain_list, parse_mcp_servers};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TollgateConfig {
    pub http: HttpConfig,
    pub browse: BrowseConfig,
    pub resilience: ResilienceConfig,
    pub tools: ToolsConfig,
    pub mcp: McpConfig,
    pub self_check: SelfCheckConfig,
}

/// Outbound HTTP client settings shared by every fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("tollgate/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Policy for the general-purpose `web_fetch` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    /// Free text, one domain per line. Empty means "any public host".
    pub allow_domains: String,
    /// Free text, one domain per line. Always wins over the allowlist.
    pub deny_domains: String,
    /// CIDR ranges exempt from the private-address check (e.g. a home LAN).
    pub ssrf_allow_cidrs: Vec<String>,
    /// Per-attempt network timeout in seconds.
    pub timeout_seconds: u64,
    /// Hard cap on downloaded body size.
    pub max_bytes: usize,
    /// Maximum number of HTTP redirects to follow.
    pub max_redirects: u8,
    /// In-memory cache TTL in minutes (0 to disable).
    pub cache_ttl_minutes: u64,
    /// Rate-limit quota per window for `web_fetch`.
    pub max_per_minute: u32,
    /// Sent as `Accept-Language` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            allow_domains: String::new(),
            deny_domains: String::new(),
            ssrf_allow_cidrs: Vec::new(),
            timeout_seconds: 20,
            max_bytes: 512 * 1024,
            max_redirects: 5,
            cache_ttl_minutes: 10,
            max_per_minute: 30,
            accept_language: None,
        }
    }
}

impl BrowseConfig {
    #[must_use]
    pub fn allowlist(&self) -> Vec<String> {
        parse_domain_list(&self.allow_domains)
    }

    #[must_use]
    pub fn denylist(&self) -> Vec<String> {
        parse_domain_list(&self.deny_domains)
    }

    /// Parsed CIDR exemptions. Unparseable entries are logged and dropped.
    #[must_use]
    pub fn ssrf_allow_nets(&self) -> Vec<ipnet::IpNet> {
        self.ssrf_allow_cidrs
            .iter()
            .filter_map(|raw| match raw.trim().parse::<ipnet::IpNet>() {
                Ok(net) => Some(net),
                Err(e) => {
                    warn!(cidr = %raw, error = %e, "ignoring invalid ssrf_allow_cidrs entry");
                    None
                },
            })
            .collect()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }
}

/// Shared cache, limiter and breaker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Length of the fixed rate-limit window.
    pub rate_window_seconds: u64,
    /// Consecutive failures that open a breaker.
    pub breaker_threshold: u32,
    /// How long an open breaker rejects calls.
    pub breaker_cooldown_seconds: u64,
    /// Response-cache size past which stale, then oldest, entries are dropped.
    pub cache_max_entries: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            rate_window_seconds: 60,
            breaker_threshold: 3,
            breaker_cooldown_seconds: 60,
            cache_max_entries: 1024,
        }
    }
}

impl ResilienceConfig {
    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_seconds)
    }

    #[must_use]
    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_seconds)
    }
}

/// Tool dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Tool names that always answer `disabled`.
    pub disabled: Vec<String>,
    /// How long an approval or file-pick prompt waits before giving up.
    pub approval_timeout_seconds: u64,
    pub notifications_enabled: bool,
    /// Cap on bytes returned by `read_file`.
    pub max_file_bytes: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            approval_timeout_seconds: 120,
            notifications_enabled: true,
            max_file_bytes: 256 * 1024,
        }
    }
}

impl ToolsConfig {
    #[must_use]
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_seconds)
    }

    #[must_use]
    pub fn is_disabled(&self, tool: &str) -> bool {
        self.disabled.iter().any(|name| name == tool)
    }
}

/// MCP-style external servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Free text, one `id|endpointUrl|optionalAuthToken` per line.
    pub servers: String,
}

impl McpConfig {
    #[must_use]
    pub fn entries(&self) -> Vec<McpServerEntry> {
        parse_mcp_servers(&self.servers)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfCheckConfig {
    pub per_tool_timeout_seconds: u64,
}

impl Default for SelfCheckConfig {
    fn default() -> Self {
        Self {
            per_tool_timeout_seconds: 15,
        }
    }
}

impl SelfCheckConfig {
    #[must_use]
    pub fn per_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.per_tool_timeout_seconds)
    }
}
