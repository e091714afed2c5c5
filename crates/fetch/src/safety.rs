//! Browse-safety validation for untrusted URLs.
//!
//! Checks run in a fixed order: scheme, denylist, allowlist, DNS, then the
//! private-address check on every resolved IP. The orchestrator calls
//! [`validate_url`] again for each redirect hop.
//!
//! The connection itself resolves the host a second time, so a DNS answer
//! that changes between validation and connect is not caught here.

use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use {async_trait::async_trait, ipnet::IpNet, tollgate_config::BrowseConfig, url::Url};

use crate::error::{Error, Result};

/// Resolves a host name to its addresses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system's `getaddrinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// Domain lists and private-range exemptions applied to browsed URLs.
#[derive(Debug, Clone, Default)]
pub struct BrowsePolicy {
    /// When non-empty, only these domains (and their subdomains) are allowed.
    pub allowlist: Vec<String>,
    pub denylist: Vec<String>,
    /// Private ranges that may be reached anyway (e.g. a trusted LAN proxy).
    pub ssrf_exemptions: Vec<IpNet>,
}

impl BrowsePolicy {
    #[must_use]
    pub fn from_config(config: &BrowseConfig) -> Self {
        Self {
            allowlist: config.allowlist(),
            denylist: config.denylist(),
            ssrf_exemptions: config.ssrf_allow_nets(),
        }
    }

    fn is_exempt(&self, ip: &IpAddr) -> bool {
        self.ssrf_exemptions.iter().any(|net| net.contains(ip))
    }
}

/// Parse and validate an untrusted URL string.
pub async fn validate(
    raw: &str,
    policy: &BrowsePolicy,
    resolver: &(dyn HostResolver + '_),
) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::invalid_url(format!("{raw}: {e}")))?;
    validate_url(&url, policy, resolver).await?;
    Ok(url)
}

/// Validate an already parsed URL.
pub async fn validate_url(
    url: &Url,
    policy: &BrowsePolicy,
    resolver: &(dyn HostResolver + '_),
) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_url(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }
    let Some(host) = url.host_str() else {
        return Err(Error::invalid_url(format!("{url}: missing host")));
    };
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host.is_empty() {
        return Err(Error::invalid_url(format!("{url}: missing host")));
    }

    if policy.denylist.iter().any(|d| domain_matches(&host, d)) {
        return Err(Error::Denylisted { host });
    }
    if !policy.allowlist.is_empty() && !policy.allowlist.iter().any(|d| domain_matches(&host, d)) {
        return Err(Error::NotAllowlisted { host });
    }

    let ips = match host.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => {
            let port = url.port_or_known_default().unwrap_or(443);
            let ips = resolver
                .resolve(&host, port)
                .await
                .map_err(|e| Error::Dns {
                    host: host.clone(),
                    reason: e.to_string(),
                })?;
            if ips.is_empty() {
                return Err(Error::Dns {
                    host,
                    reason: "no addresses returned".into(),
                });
            }
            ips
        },
    };

    if let Some(ip) = ips
        .into_iter()
        .find(|ip| is_blocked_ip(ip) && !policy.is_exempt(ip))
    {
        tracing::warn!(%host, %ip, "blocked request to private address");
        return Err(Error::Ssrf { host, ip });
    }
    Ok(())
}

/// `host` equals `domain` or is a subdomain of it on a dot boundary.
#[must_use]
pub fn domain_matches(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Loopback, private, link-local and other non-public ranges.
#[must_use]
pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => {
            embedded_v4(v6).is_some_and(|v4| is_blocked_v4(&v4)) || is_blocked_v6(v6)
        },
    }
}

/// The IPv4 address an IPv6 address routes to, for the translation and
/// tunnelling prefixes: mapped `::ffff:0:0/96`, compatible `::/96`, NAT64
/// `64:ff9b::/96` and 6to4 `2002::/16`.
fn embedded_v4(v6: &Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return Some(v4);
    }
    let join = |hi: u16, lo: u16| Ipv4Addr::from((u32::from(hi) << 16) | u32::from(lo));
    match v6.segments() {
        [0, 0, 0, 0, 0, 0, hi, lo] | [0x64, 0xff9b, 0, 0, 0, 0, hi, lo] => Some(join(hi, lo)),
        [0x2002, hi, lo, ..] => Some(join(hi, lo)),
        _ => None,
    }
}

fn is_blocked_v4(v4: &Ipv4Addr) -> bool {
    let [a, b, c, _] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        || v4.is_multicast()
        || v4.is_documentation()
        // 0.0.0.0/8
        || a == 0
        // 100.64.0.0/10 (CGNAT)
        || (a == 100 && (b & 0xC0) == 64)
        // 192.0.0.0/24
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 (benchmarking)
        || (a == 198 && (b & 0xFE) == 18)
        // 240.0.0.0/4 (reserved)
        || a >= 240
}

fn is_blocked_v6(v6: &Ipv6Addr) -> bool {
    let seg0 = v6.segments()[0];
    v6.is_loopback()
        || v6.is_unspecified()
        || v6.is_multicast()
        // fc00::/7 (unique local)
        || (seg0 & 0xFE00) == 0xFC00
        // fe80::/10 (link-local)
        || (seg0 & 0xFFC0) == 0xFE80
        // fec0::/10 (site-local, deprecated)
        || (seg0 & 0xFFC0) == 0xFEC0
        // 2001:db8::/32 (documentation)
        || (seg0 == 0x2001 && v6.segments()[1] == 0x0db8)
}
