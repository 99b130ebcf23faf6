//! Configuration types for yaddns
//!
//! The configuration is immutable for the duration of a run. How it is
//! supplied (environment, file, flags) is up to the host; the binary crate
//! reads it from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default provider API base URL
pub const DEFAULT_API_BASE: &str = "https://pddimp.yandex.ru/api2/admin";

/// Default IPv4 discovery endpoint (plain-text body)
pub const DEFAULT_IPV4_URL: &str = "http://ipv4.myexternalip.com/raw";

/// Default record TTL in seconds
pub const DEFAULT_TTL: u32 = 900;

/// Default HTTP request timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Configuration for a single synchronization run
#[derive(Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// PDD API token
    /// ⚠️ NEVER log this value
    pub token: String,

    /// Domain owning the record set (e.g. "example.com")
    pub domain: String,

    /// Fully-qualified name of the record to keep in sync (e.g. "home.example.com")
    pub subdomain: String,

    /// TTL to set on updated records
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Provider API base URL, without trailing slash
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Where to discover the external address
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Log intended updates without issuing them
    #[serde(default)]
    pub dry_run: bool,

    /// Skip the update when the record content already equals the discovered address
    #[serde(default)]
    pub skip_unchanged: bool,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("subdomain", &self.subdomain)
            .field("ttl", &self.ttl)
            .field("api_base", &self.api_base)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("discovery", &self.discovery)
            .field("dry_run", &self.dry_run)
            .field("skip_unchanged", &self.skip_unchanged)
            .finish()
    }
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the four
    /// required values
    pub fn new(
        token: impl Into<String>,
        domain: impl Into<String>,
        subdomain: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            token: token.into(),
            domain: domain.into(),
            subdomain: subdomain.into(),
            ttl,
            api_base: default_api_base(),
            http_timeout_secs: default_http_timeout_secs(),
            discovery: DiscoveryConfig::default(),
            dry_run: false,
            skip_unchanged: false,
        }
    }

    /// Override the provider API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the discovery configuration
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable the content-equality short-circuit
    pub fn with_skip_unchanged(mut self, skip_unchanged: bool) -> Self {
        self.skip_unchanged = skip_unchanged;
        self
    }

    /// HTTP timeout as a `Duration`
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.token.is_empty() {
            return Err(crate::Error::config("API token cannot be empty"));
        }
        if self.domain.is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if self.subdomain.is_empty() {
            return Err(crate::Error::config("Subdomain cannot be empty"));
        }

        let suffix = format!(".{}", self.domain);
        if self.subdomain != self.domain && !self.subdomain.ends_with(&suffix) {
            return Err(crate::Error::config(format!(
                "Subdomain '{}' is not inside domain '{}' (use the domain itself for the apex record)",
                self.subdomain, self.domain
            )));
        }

        if self.ttl == 0 {
            return Err(crate::Error::config("TTL must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }

        validate_url("API base", &self.api_base)?;
        self.discovery.validate()
    }
}

/// External address discovery configuration
///
/// IPv4 and IPv6 are looked up independently. At least one lookup must be
/// configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// IPv4 lookup
    #[serde(default)]
    pub ipv4: Option<LookupConfig>,

    /// IPv6 lookup (disabled by default)
    #[serde(default)]
    pub ipv6: Option<LookupConfig>,
}

impl DiscoveryConfig {
    /// Validate every configured lookup
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ipv4.is_none() && self.ipv6.is_none() {
            return Err(crate::Error::config("No IP discovery lookup configured"));
        }

        for lookup in self.ipv4.iter().chain(self.ipv6.iter()) {
            lookup.validate()?;
        }

        Ok(())
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ipv4: Some(LookupConfig::plain(DEFAULT_IPV4_URL)),
            ipv6: None,
        }
    }
}

/// One "what is my IP" endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Endpoint URL
    pub url: String,

    /// Optional pattern with exactly one capture group. When absent the
    /// trimmed response body is used as-is.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl LookupConfig {
    /// Endpoint answering with the bare address
    pub fn plain(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pattern: None,
        }
    }

    /// Endpoint whose body must be matched against `pattern`
    pub fn with_pattern(url: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pattern: Some(pattern.into()),
        }
    }

    /// Yandex IPv4 endpoint (body contains `IPv4: <addr>`)
    pub fn yandex_v4() -> Self {
        Self::with_pattern("https://ipv4.internet.yandex.ru/", r"IPv4: (\S+)")
    }

    /// Yandex IPv6 endpoint (body contains `IPv6: <addr>`)
    pub fn yandex_v6() -> Self {
        Self::with_pattern("https://ipv6.internet.yandex.ru/", r"IPv6: (\S+)")
    }

    /// Validate URL and pattern
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_url("IP lookup URL", &self.url)?;

        if let Some(ref pattern) = self.pattern {
            let re = regex::Regex::new(pattern).map_err(|e| {
                crate::Error::config(format!("Invalid IP lookup pattern '{}': {}", pattern, e))
            })?;
            // captures_len() counts the implicit whole-match group
            if re.captures_len() != 2 {
                return Err(crate::Error::config(format!(
                    "IP lookup pattern '{}' must have exactly one capture group",
                    pattern
                )));
            }
        }

        Ok(())
    }
}

fn validate_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}
