// # reqwest HTTP Transport
//
// Production implementation of `yaddns_core::HttpTransport`.
//
// ## Behavior
//
// - One client per run, built once with a fixed timeout (20s by default)
// - `User-Agent: yaddns` on every request
// - `PddToken` header only when the request carries a token
// - POST bodies sent as `application/x-www-form-urlencoded; param=value`
// - Any status other than 200 is an error; the body of such a response is
//   logged at debug level and discarded
// - NO retry logic, NO backoff: the first failure ends the run
//
// ## Security
//
// - The token NEVER appears in logs or error messages
// - Listing URLs carry the token as a query parameter, so URLs are redacted
//   before they are logged

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use yaddns_core::error::redact_url;
use yaddns_core::traits::{
    DEFAULT_HTTP_TIMEOUT, FORM_CONTENT_TYPE, HttpMethod, HttpRequest, HttpTransport,
    PDD_TOKEN_HEADER, USER_AGENT,
};
use yaddns_core::{Error, Result};

/// HTTP transport backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    ///
    /// # Returns
    ///
    /// - `Ok(ReqwestTransport)`
    /// - `Err(Error::Config)`: the TLS backend or client could not be initialized
    pub fn new(timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::config("HTTP timeout must be > 0"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Create a transport with the default 20 second timeout
    pub fn with_default_timeout() -> Result<Self> {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        if let Some(ref token) = request.pdd_token {
            let mut value = HeaderValue::from_str(token)
                .map_err(|_| Error::config("API token contains characters not allowed in a header"))?;
            value.set_sensitive(true);
            builder = builder.header(PDD_TOKEN_HEADER, value);
        }

        if let Some(body) = request.encoded_form() {
            builder = builder
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(body);
        }

        Ok(builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let safe_url = redact_url(&request.url);
        tracing::debug!(method = request.method.as_str(), url = %safe_url, "Sending request");

        let response = self
            .build(&request)?
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                Error::transport(format!(
                    "{} {} {}: {}",
                    request.method.as_str(),
                    safe_url,
                    kind,
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            tracing::debug!(status = status.as_u16(), body = %error_text, "Unexpected HTTP status");
            return Err(Error::http_status(status.as_u16(), &request.url));
        }

        let body = response.bytes().await.map_err(|e| {
            Error::transport(format!("Failed to read response from {}: {}", safe_url, e.without_url()))
        })?;

        Ok(body.to_vec())
    }
}
