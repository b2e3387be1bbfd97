//! Relay configuration.
//!
//! Everything that varies between deployments lives here: the header
//! profile, the default extension table, the origin-check mode, the blocked
//! status set and the host policy. The configuration is built once at
//! startup and shared read-only.

use std::{collections::HashSet, net::IpAddr, time::Duration};

use anyhow::{Context, bail};
use url::{Host, Url};

use crate::{proxy::HeaderProfile, relay::ContentType};

/// Default forbidden-host blocklist.
pub const DEFAULT_FORBIDDEN_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "169.254.169.254",
    "metadata.google.internal",
];

/// Whether a `directUrl` must stay on the origin that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OriginCheck {
    /// Reject a `directUrl` whose origin differs from the supplied `origin`.
    #[default]
    Strict,
    /// Accept any `directUrl`, e.g. when the provider redirects to a CDN.
    Relaxed,
}

impl OriginCheck {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "relaxed" => Ok(Self::Relaxed),
            other => bail!("unknown origin check mode: {other}"),
        }
    }
}

/// Protocol allow-list and forbidden-host blocklist.
#[derive(Debug, Clone)]
pub struct HostPolicy {
    pub allowed_schemes: HashSet<String>,
    pub forbidden_hosts: HashSet<String>,
    /// Also reject loopback, unspecified and link-local IP literals.
    pub deny_internal_addresses: bool,
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            forbidden_hosts: DEFAULT_FORBIDDEN_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            deny_internal_addresses: true,
        }
    }
}

impl HostPolicy {
    /// A policy that only checks the scheme. Used when the upstream is local.
    pub fn permissive() -> Self {
        Self {
            forbidden_hosts: HashSet::new(),
            deny_internal_addresses: false,
            ..Self::default()
        }
    }

    pub fn is_allowed_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes.contains(scheme)
    }

    pub fn is_forbidden(&self, url: &Url) -> bool {
        let Some(host) = url.host() else {
            return true;
        };

        let name = match &host {
            Host::Domain(d) => d.trim_end_matches('.').to_lowercase(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        };
        if self.forbidden_hosts.contains(&name) {
            return true;
        }

        if !self.deny_internal_addresses {
            return false;
        }

        let ip = match host {
            Host::Ipv4(ip) => IpAddr::V4(ip),
            Host::Ipv6(ip) => IpAddr::V6(ip),
            Host::Domain(_) => return false,
        };
        is_internal(ip)
    }
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_unspecified() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_internal(IpAddr::V4(v4));
            }
            // fe80::/10
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Default container extension per content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTable {
    pub movie: String,
    pub series: String,
    pub live: String,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self {
            movie: "mp4".to_string(),
            series: "mp4".to_string(),
            live: "ts".to_string(),
        }
    }
}

impl ExtensionTable {
    /// Extension used when the request does not name one.
    ///
    /// Live channels flagged as HLS by the provider's stream-type hint are
    /// requested as playlists.
    pub fn default_for(&self, content_type: ContentType, stream_type: Option<&str>) -> &str {
        match content_type {
            ContentType::Movie => self.movie.as_str(),
            ContentType::Series => self.series.as_str(),
            ContentType::Live => match stream_type.map(str::to_lowercase).as_deref() {
                Some("hls") | Some("m3u8") => "m3u8",
                _ => self.live.as_str(),
            },
        }
    }
}

/// Host rewrite applied before fetching, for providers that publish one
/// hostname but serve from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAlias {
    pub from: String,
    pub to_host: String,
    pub to_port: Option<u16>,
}

impl HostAlias {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let (from, to) = s
            .split_once('=')
            .with_context(|| format!("host alias must be from=to[:port], got {s:?}"))?;
        let (to_host, to_port) = match to.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .with_context(|| format!("invalid port in host alias {s:?}"))?;
                (host, Some(port))
            }
            None => (to, None),
        };
        if from.trim().is_empty() || to_host.trim().is_empty() {
            bail!("host alias must be from=to[:port], got {s:?}");
        }
        Ok(Self {
            from: from.trim().to_lowercase(),
            to_host: to_host.trim().to_string(),
            to_port,
        })
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        host == self.from || host.ends_with(&format!(".{}", self.from))
    }

    /// Rewrite `url` in place if its host matches. Returns whether it did.
    pub fn apply(&self, url: &mut Url) -> bool {
        if !url.host_str().is_some_and(|h| self.matches(h)) {
            return false;
        }
        if url.set_host(Some(&self.to_host)).is_err() {
            return false;
        }
        if let Some(port) = self.to_port {
            // Only fails for cannot-be-a-base URLs, which have no host anyway.
            let _ = url.set_port(Some(port));
        }
        true
    }
}

/// Immutable relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Path of the relay endpoint; also the path embedded in relay URLs.
    pub base_path: String,
    pub header_profile: HeaderProfile,
    pub extensions: ExtensionTable,
    pub origin_check: OriginCheck,
    pub hosts: HostPolicy,
    pub host_aliases: Vec<HostAlias>,
    pub blocked_statuses: HashSet<u16>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_redirects: usize,
    /// Playlists larger than this are refused instead of buffered.
    pub max_manifest_bytes: usize,
    pub cors_origin: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_path: "/api/stream".to_string(),
            header_profile: HeaderProfile::browser(),
            extensions: ExtensionTable::default(),
            origin_check: OriginCheck::default(),
            hosts: HostPolicy::default(),
            host_aliases: Vec::new(),
            blocked_statuses: [403, 456].into_iter().collect(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_redirects: 10,
            max_manifest_bytes: 4 * 1024 * 1024,
            cors_origin: "*".to_string(),
        }
    }
}

impl RelayConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.parse().context("PORT must be a port number")?;
        }
        if let Some(path) = lookup("RELAY_BASE_PATH") {
            if !path.starts_with('/') {
                bail!("RELAY_BASE_PATH must start with '/'");
            }
            config.base_path = path;
        }

        if let Some(name) = lookup("RELAY_HEADER_PROFILE") {
            config.header_profile = HeaderProfile::preset(&name)?;
        }
        if let Some(ua) = lookup("RELAY_USER_AGENT") {
            config.header_profile.user_agent = ua;
        }
        if let Some(accept) = lookup("RELAY_ACCEPT") {
            config.header_profile.accept = accept;
        }
        if let Some(referer) = lookup("RELAY_REFERER") {
            config.header_profile.referer = Some(referer).filter(|r| !r.is_empty());
        }

        if let Some(mode) = lookup("RELAY_ORIGIN_CHECK") {
            config.origin_check = OriginCheck::parse(&mode)?;
        }
        if let Some(codes) = lookup("RELAY_BLOCKED_STATUSES") {
            config.blocked_statuses = split_list(&codes)
                .map(|c| {
                    c.parse::<u16>()
                        .with_context(|| format!("invalid status code in RELAY_BLOCKED_STATUSES: {c}"))
                })
                .collect::<anyhow::Result<_>>()?;
        }
        if let Some(hosts) = lookup("RELAY_FORBIDDEN_HOSTS") {
            config.hosts.forbidden_hosts = split_list(&hosts).map(str::to_lowercase).collect();
        }
        if let Some(deny) = lookup("RELAY_DENY_INTERNAL_ADDRESSES") {
            config.hosts.deny_internal_addresses = parse_bool(&deny)
                .context("RELAY_DENY_INTERNAL_ADDRESSES must be true or false")?;
        }
        if let Some(ext) = lookup("RELAY_LIVE_EXTENSION") {
            config.extensions.live = ext;
        }
        if let Some(aliases) = lookup("RELAY_HOST_ALIASES") {
            config.host_aliases = split_list(&aliases)
                .map(HostAlias::parse)
                .collect::<anyhow::Result<_>>()?;
        }

        if let Some(secs) = lookup("RELAY_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(
                secs.parse()
                    .context("RELAY_CONNECT_TIMEOUT_SECS must be an integer")?,
            );
        }
        if let Some(secs) = lookup("RELAY_READ_TIMEOUT_SECS") {
            config.read_timeout = Duration::from_secs(
                secs.parse()
                    .context("RELAY_READ_TIMEOUT_SECS must be an integer")?,
            );
        }
        if let Some(n) = lookup("RELAY_MAX_REDIRECTS") {
            config.max_redirects = n.parse().context("RELAY_MAX_REDIRECTS must be an integer")?;
        }
        if let Some(n) = lookup("RELAY_MAX_MANIFEST_BYTES") {
            config.max_manifest_bytes = n
                .parse()
                .context("RELAY_MAX_MANIFEST_BYTES must be an integer")?;
        }
        if let Some(origin) = lookup("CORS_ALLOWED_ORIGIN") {
            config.cors_origin = origin;
        }

        Ok(config)
    }

    pub fn is_blocked_status(&self, status: u16) -> bool {
        self.blocked_statuses.contains(&status)
    }

    /// Apply the first matching host alias to `url`.
    pub fn apply_host_aliases(&self, url: &mut Url) {
        for alias in &self.host_aliases {
            if alias.apply(url) {
                tracing::debug!("Host alias applied: {} -> {}", alias.from, alias.to_host);
                return;
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
