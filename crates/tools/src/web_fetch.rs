use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tollgate_config::BrowseConfig,
    tollgate_fetch::{BrowsePolicy, FetchClient, FetchCode, FetchRequest},
    tracing::debug,
};

use crate::{
    error::Result,
    params::{optional_limit, required_str},
    registry::{AgentTool, ParamKind, ParamSpec, ToolGroup},
    remote::fetch_ok,
};

/// Web fetch tool: lets the model read an arbitrary http(s) page through
/// the guarded fetch pipeline.
pub struct WebFetchTool {
    client: FetchClient,
    config: BrowseConfig,
    policy: BrowsePolicy,
}

impl WebFetchTool {
    pub fn new(client: FetchClient, config: BrowseConfig) -> Self {
        let policy = BrowsePolicy::from_config(&config);
        Self {
            client,
            config,
            policy,
        }
    }
}

/// Extract readable content from the response body based on content type.
fn extract_content(body: &str, content_type: &str) -> (String, &'static str) {
    let ct_lower = content_type.to_ascii_lowercase();

    if ct_lower.contains("json") {
        if let Ok(parsed) = serde_json::from_str::<Value>(body) {
            let pretty = serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| body.into());
            return (pretty, "json");
        }
        return (body.into(), "text");
    }

    let looks_like_html = ct_lower.contains("html")
        || (ct_lower.is_empty() && body.trim_start().starts_with('<'));
    if looks_like_html {
        return (html_to_text(body), "text");
    }
    (body.into(), "raw")
}

const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "blockquote", "pre",
];

/// Strip tags, drop script/style bodies, decode common entities and
/// collapse whitespace. Block-level tags become line breaks.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut skip_until: Option<&'static str> = None;
    let mut last_was_space = true;
    let mut rest = html;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            let Some(end) = rest.find('>') else {
                break;
            };
            let tag = rest[1..end].trim().to_ascii_lowercase();
            rest = &rest[end + 1..];
            let closing = tag.starts_with('/');
            let name: String = tag
                .trim_start_matches('/')
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();

            if let Some(until) = skip_until {
                if closing && name == until {
                    skip_until = None;
                }
                continue;
            }
            if !closing && (name == "script" || name == "style") && !tag.ends_with('/') {
                skip_until = Some(if name == "script" { "script" } else { "style" });
                continue;
            }
            if BLOCK_TAGS.contains(&name.as_str()) {
                while out.ends_with(' ') {
                    out.pop();
                }
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                last_was_space = true;
            }
            continue;
        }

        if skip_until.is_some() {
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        if ch == '&'
            && let Some(semi) = rest
                .char_indices()
                .take(10)
                .find_map(|(i, c)| (c == ';').then_some(i))
            && let Some(decoded) = decode_entity(&rest[..=semi])
        {
            if decoded == ' ' {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            } else {
                out.push(decoded);
                last_was_space = false;
            }
            rest = &rest[semi + 1..];
            continue;
        }

        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
        rest = &rest[ch.len_utf8()..];
    }

    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "&amp;" => Some('&'),
        "&lt;" => Some('<'),
        "&gt;" => Some('>'),
        "&quot;" => Some('"'),
        "&apos;" | "&#39;" => Some('\''),
        "&nbsp;" | "&#160;" => Some(' '),
        _ => {
            let num = entity.strip_prefix("&#")?.strip_suffix(';')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        },
    }
}

#[async_trait]
impl AgentTool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its readable text. Only public http(s) URLs are \
         allowed; private network addresses and blocked domains are refused."
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Browsing
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("url", ParamKind::String, "The http or https URL to fetch"),
            ParamSpec::optional(
                "max_bytes",
                ParamKind::Integer,
                "Maximum bytes to download (capped by configuration)",
            ),
        ]
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let url = required_str(&params, "url")?.trim();
        let cap = self.config.max_bytes.max(1) as u64;
        let max_bytes = optional_limit(&params, "max_bytes", cap, cap)? as usize;

        debug!(url, max_bytes, "web_fetch");
        let request =
            FetchRequest::browse(url, &self.config, &self.policy).with_max_bytes(max_bytes);
        let result = fetch_ok(&self.client, &request).await?;

        let content_type = result.content_type.clone().unwrap_or_default();
        let (content, format) = extract_content(&result.body, &content_type);
        Ok(json!({
            "url": url,
            "final_url": result.final_url,
            "status": result.http_status,
            "content_type": result.content_type,
            "format": format,
            "content": content,
            "truncated": result.truncated,
            "cached": result.code == Some(FetchCode::Cached),
        }))
    }
}
