//! Error types for yaddns
//!
//! Every error in this crate is fatal for the run. Nothing in the core
//! catches or recovers from them; they propagate with `?` up to the binary,
//! which maps them onto an exit code.

use thiserror::Error;

/// Result type alias for yaddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for yaddns
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure, timeout, or unreadable response body
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with something other than HTTP 200
    #[error("Transport error: unexpected HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// Request URL (never carries credentials in logs, see `redact_url`)
        url: String,
    },

    /// Response body does not match the expected envelope
    #[error("Malformed provider response ({context}): {source}")]
    Decode {
        /// Which response was being decoded
        context: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The provider returned a non-empty `error` field
    #[error("Provider error on '{command}': {message}")]
    Provider {
        /// Provider API command (e.g. `dns/list`)
        command: &'static str,
        /// Message exactly as returned by the provider
        message: String,
    },

    /// Decoded data violates a domain invariant
    #[error("Invariant failed: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Configuration errors, raised before any network call
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Domain invariants checked during a run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The listing echoed a different domain than the one requested
    #[error("record set domain '{actual}' != requested domain '{expected}'")]
    DomainMismatch {
        /// Domain from configuration
        expected: String,
        /// Domain echoed by the provider
        actual: String,
    },

    /// The listing contained no records at all
    #[error("record set for '{domain}' is empty")]
    EmptyRecordList {
        /// Requested domain
        domain: String,
    },

    /// No eligible A record matched the target subdomain
    #[error("subdomain '{subdomain}' is not known to the provider for domain '{domain}'")]
    SubdomainNotFound {
        /// Target FQDN
        subdomain: String,
        /// Owning domain
        domain: String,
    },

    /// None of the configured lookups produced a valid address
    #[error("could not determine external address")]
    AddressUndiscoverable,
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, url: impl AsRef<str>) -> Self {
        Self::HttpStatus {
            status,
            url: redact_url(url.as_ref()),
        }
    }

    /// Create a decode error
    pub fn decode(context: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { context, source }
    }

    /// Create a provider error
    pub fn provider(command: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            command,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short stable label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(_) | Error::HttpStatus { .. } => "transport",
            Error::Decode { .. } => "decode",
            Error::Provider { .. } => "provider",
            Error::Invariant(_) => "invariant",
            Error::Config(_) => "config",
        }
    }
}

/// Strip the `token` query parameter from a URL before it lands in an error
/// message or a log line.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.query().is_none() {
                return parsed.into();
            }
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let v = if k == "token" { "<REDACTED>".into() } else { v.into_owned() };
                    (k.into_owned(), v)
                })
                .collect();
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.into()
        }
        Err(_) => raw.split('?').next().unwrap_or_default().to_string(),
    }
}
