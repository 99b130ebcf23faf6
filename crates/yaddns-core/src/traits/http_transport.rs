// # HTTP Transport Trait
//
// Minimal request/response abstraction used by discovery, the record
// repository and the reconciliation engine.
//
// ## Implementations
//
// - reqwest-based: `yaddns-http` crate
// - Scripted fakes in the contract tests
//
// ## Contract
//
// - Every request carries the `yaddns` user-agent
// - `PddToken` header is attached only when a token is present
// - POST bodies are `application/x-www-form-urlencoded; param=value`
// - Any status other than 200 is an error; so is any connection failure
// - No retry, no backoff

use async_trait::async_trait;
use std::time::Duration;

/// User-agent sent with every request
pub const USER_AGENT: &str = "yaddns";

/// Content type for POST bodies. The `param=value` suffix is what the PDD
/// API expects.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; param=value";

/// Authorization header understood by the PDD API
pub const PDD_TOKEN_HEADER: &str = "PddToken";

/// Default request timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A single request to be executed by an [`HttpTransport`]
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Value for the `PddToken` header
    pub pdd_token: Option<String>,
    /// Form fields, in wire order (POST only)
    pub form: Option<Vec<(String, String)>>,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &crate::error::redact_url(&self.url))
            .field("pdd_token", &self.pdd_token.as_ref().map(|_| "<REDACTED>"))
            .field("form", &self.form)
            .finish()
    }
}

impl HttpRequest {
    /// Plain GET without credentials
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            pdd_token: None,
            form: None,
        }
    }

    /// POST with a URL-encoded form body
    pub fn post(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            pdd_token: None,
            form: Some(form),
        }
    }

    /// Attach the `PddToken` header. Empty tokens are ignored.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.pdd_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Form body serialized as `application/x-www-form-urlencoded`
    pub fn encoded_form(&self) -> Option<String> {
        self.form.as_ref().map(|fields| {
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter())
                .finish()
        })
    }
}

/// Trait for HTTP transport implementations
///
/// Implementations hold no per-call mutable state and can be shared freely
/// behind an `Arc`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a request and return the raw response body
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: body of a 200 response
    /// - `Err(Error::Transport)`: connection failure, timeout, unreadable body
    /// - `Err(Error::HttpStatus)`: any status other than 200
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, crate::Error>;
}
