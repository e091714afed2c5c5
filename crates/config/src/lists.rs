//! Parsers for the user-editable free-text settings: domain lists and MCP
//! server lines. Both are one entry per line; blank lines and `#` comments
//! are skipped.

use {tracing::warn, url::Url};

/// Parse a domain list into normalized lower-case host suffixes.
///
/// Leading `*.`/`.` and trailing dots are stripped so `*.Example.COM.` and
/// `example.com` mean the same thing.
#[must_use]
pub fn parse_domain_list(text: &str) -> Vec<String> {
    entries(text)
        .map(|line| {
            line.trim_start_matches("*.")
                .trim_start_matches('.')
                .trim_end_matches('.')
                .to_ascii_lowercase()
        })
        .filter(|domain| !domain.is_empty())
        .collect()
}

/// One configured MCP server.
#[derive(Clone, PartialEq, Eq)]
pub struct McpServerEntry {
    pub id: String,
    pub url: Url,
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for McpServerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServerEntry")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Parse `id|endpointUrl|optionalAuthToken` lines.
///
/// Lines with a missing id, an unparseable or non-http(s) URL, or a duplicate
/// id are logged and skipped; the first occurrence of an id wins.
#[must_use]
pub fn parse_mcp_servers(text: &str) -> Vec<McpServerEntry> {
    let mut servers: Vec<McpServerEntry> = Vec::new();
    for line in entries(text) {
        let mut parts = line.splitn(3, '|').map(str::trim);
        let id = parts.next().unwrap_or_default();
        let raw_url = parts.next().unwrap_or_default();
        let token = parts.next().filter(|t| !t.is_empty());

        if id.is_empty() {
            warn!(line, "skipping MCP server line without id");
            continue;
        }
        let url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                warn!(id, scheme = url.scheme(), "skipping MCP server with unsupported scheme");
                continue;
            },
            Err(e) => {
                warn!(id, error = %e, "skipping MCP server with invalid URL");
                continue;
            },
        };
        if servers.iter().any(|s| s.id == id) {
            warn!(id, "skipping duplicate MCP server id");
            continue;
        }
        servers.push(McpServerEntry {
            id: id.to_string(),
            url,
            auth_token: token.map(String::from),
        });
    }
    servers
}

fn entries(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
