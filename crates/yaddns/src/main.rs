// # yaddns - one-shot dynamic DNS synchronizer
//
// Thin entry point. All synchronization logic lives in yaddns-core; this
// binary only:
// 1. Reads configuration from environment variables
// 2. Initializes tracing
// 3. Builds the HTTP transport and runs a single synchronization
// 4. Maps the outcome onto an exit code
//
// The run is one-shot. Schedule it externally (cron, systemd timer).
//
// ## Configuration
//
// ### Required
// - `YADDNS_TOKEN`: PDD API token
// - `YADDNS_DOMAIN`: Domain owning the record (e.g. example.com)
//
// ### Optional
// - `YADDNS_SUBDOMAIN`: FQDN of the record to update (default: the domain)
// - `YADDNS_TTL`: TTL in seconds (default: 900)
// - `YADDNS_API_BASE`: Provider API base URL
// - `YADDNS_HTTP_TIMEOUT_SECS`: Request timeout (default: 20)
// - `YADDNS_IPV4_URL` / `YADDNS_IPV4_PATTERN`: IPv4 lookup endpoint and optional
//   capture pattern (`none` disables the IPv4 lookup)
// - `YADDNS_IPV6_URL` / `YADDNS_IPV6_PATTERN`: IPv6 lookup (disabled by default)
// - `YADDNS_MODE`: `live` (default) or `dry-run`
// - `YADDNS_SKIP_UNCHANGED`: `true` to skip records already holding the address
// - `YADDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export YADDNS_TOKEN=your_token
// export YADDNS_DOMAIN=example.com
// export YADDNS_SUBDOMAIN=home.example.com
//
// yaddns
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use yaddns_core::config::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IPV4_URL, DEFAULT_TTL};
use yaddns_core::{DiscoveryConfig, LookupConfig, SyncConfig, SyncRunner};
use yaddns_http::ReqwestTransport;

/// Exit codes for the different ways a run can end
///
/// - 0: Synchronization completed
/// - 1: Configuration or startup error
/// - 2: Run failed (transport, decode, provider or invariant error)
#[derive(Debug, Clone, Copy)]
enum YaddnsExitCode {
    Success = 0,
    ConfigError = 1,
    RunFailed = 2,
}

impl From<YaddnsExitCode> for ExitCode {
    fn from(code: YaddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Everything read from the environment
struct EnvConfig {
    sync: SyncConfig,
    log_level: Level,
}

impl EnvConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `get`, so tests don't touch the process env
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = get("YADDNS_TOKEN").context(
            "YADDNS_TOKEN is required. Set it via: export YADDNS_TOKEN=your_token",
        )?;
        let domain = get("YADDNS_DOMAIN").context(
            "YADDNS_DOMAIN is required. Set it via: export YADDNS_DOMAIN=example.com",
        )?;
        let subdomain = get("YADDNS_SUBDOMAIN").unwrap_or_else(|| domain.clone());

        let ttl = parse_or("YADDNS_TTL", get("YADDNS_TTL"), DEFAULT_TTL)?;
        let http_timeout_secs = parse_or(
            "YADDNS_HTTP_TIMEOUT_SECS",
            get("YADDNS_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;

        let ipv4 = match get("YADDNS_IPV4_URL").as_deref() {
            Some("none") => None,
            Some(url) => Some(lookup(url, get("YADDNS_IPV4_PATTERN"))),
            None => Some(lookup(DEFAULT_IPV4_URL, get("YADDNS_IPV4_PATTERN"))),
        };
        let ipv6 = get("YADDNS_IPV6_URL").map(|url| lookup(&url, get("YADDNS_IPV6_PATTERN")));

        let dry_run = match get("YADDNS_MODE").unwrap_or_default().to_lowercase().as_str() {
            "" | "live" => false,
            "dry-run" => true,
            other => anyhow::bail!("YADDNS_MODE '{}' is not valid. Valid modes: live, dry-run", other),
        };

        let skip_unchanged = parse_or(
            "YADDNS_SKIP_UNCHANGED",
            get("YADDNS_SKIP_UNCHANGED"),
            false,
        )?;

        let log_level = match get("YADDNS_LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            other => anyhow::bail!(
                "YADDNS_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            ),
        };

        let mut sync = SyncConfig::new(token, domain, subdomain, ttl)
            .with_discovery(DiscoveryConfig { ipv4, ipv6 })
            .with_dry_run(dry_run)
            .with_skip_unchanged(skip_unchanged);
        sync.http_timeout_secs = http_timeout_secs;
        if let Some(api_base) = get("YADDNS_API_BASE") {
            sync = sync.with_api_base(api_base);
        }

        Ok(Self { sync, log_level })
    }
}

fn lookup(url: &str, pattern: Option<String>) -> LookupConfig {
    match pattern {
        Some(pattern) => LookupConfig::with_pattern(url, pattern),
        None => LookupConfig::plain(url),
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
    }
}

fn main() -> ExitCode {
    let config = match EnvConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return YaddnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.sync.validate() {
        eprintln!("Configuration validation error: {}", e);
        return YaddnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return YaddnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return YaddnsExitCode::ConfigError.into();
        }
    };

    rt.block_on(run(config.sync)).into()
}

/// Build the transport and perform one synchronization
async fn run(config: SyncConfig) -> YaddnsExitCode {
    let transport = match ReqwestTransport::new(config.http_timeout()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            return YaddnsExitCode::ConfigError;
        }
    };

    let runner = match SyncRunner::new(transport, config) {
        Ok(runner) => runner,
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            return YaddnsExitCode::ConfigError;
        }
    };

    match runner.run().await {
        Ok(report) => {
            info!(updated = ?report.updated, unchanged = ?report.unchanged, "Done");
            YaddnsExitCode::Success
        }
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            YaddnsExitCode::RunFailed
        }
    }
}
