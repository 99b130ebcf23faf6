//! External address discovery
//!
//! Fetches the caller's public address from "what is my IP" endpoints.
//! Each endpoint is paired with an [`Extractor`] that pulls the address
//! candidate out of the response body:
//!
//! - [`Extractor::PlainBody`]: body is the address, surrounded by optional
//!   spaces and line breaks
//! - [`Extractor::Pattern`]: first capture group of the first match
//!
//! A candidate that is empty or not a well-formed IP literal is not an
//! error here; the lookup simply yields nothing. Only when every configured
//! lookup yields nothing does discovery fail.

use crate::config::{DiscoveryConfig, LookupConfig};
use crate::error::{Error, InvariantViolation, Result};
use crate::traits::{HttpRequest, HttpTransport};
use regex::Regex;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether `addr` is a syntactically valid IPv4 or IPv6 literal
pub fn is_address_valid(addr: &str) -> bool {
    !addr.is_empty() && addr.parse::<IpAddr>().is_ok()
}

/// Discovered external address, one slot per family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalAddress {
    pub v4: Option<Ipv4Addr>,
    pub v6: Option<Ipv6Addr>,
}

impl ExternalAddress {
    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }
}

impl fmt::Display for ExternalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v4 = self.v4.map(|ip| ip.to_string()).unwrap_or_else(|| "-".into());
        let v6 = self.v6.map(|ip| ip.to_string()).unwrap_or_else(|| "-".into());
        write!(f, "v4={} v6={}", v4, v6)
    }
}

/// How to turn a response body into an address candidate
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Trim spaces, CR and LF from both ends of the body
    PlainBody,
    /// First capture of the first match
    Pattern(Regex),
}

impl Extractor {
    /// Build the extractor described by a lookup configuration
    pub fn from_lookup(lookup: &LookupConfig) -> Result<Self> {
        match lookup.pattern {
            None => Ok(Extractor::PlainBody),
            Some(ref pattern) => Regex::new(pattern).map(Extractor::Pattern).map_err(|e| {
                Error::config(format!("Invalid IP lookup pattern '{}': {}", pattern, e))
            }),
        }
    }

    /// Extract the address candidate. Returns an empty string when nothing
    /// matches.
    pub fn extract<'a>(&self, body: &'a str) -> &'a str {
        match self {
            Extractor::PlainBody => body.trim_matches(|c| matches!(c, ' ' | '\r' | '\n')),
            Extractor::Pattern(re) => re
                .captures(body)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default(),
        }
    }
}

/// Looks up the external address through an [`HttpTransport`]
pub struct IpDiscoverer {
    transport: Arc<dyn HttpTransport>,
}

impl IpDiscoverer {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Query one endpoint
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ip))`: a valid address was extracted
    /// - `Ok(None)`: the body held no valid address
    /// - `Err(Error)`: the request itself failed
    pub async fn discover(&self, url: &str, extractor: &Extractor) -> Result<Option<IpAddr>> {
        let body = self.transport.execute(HttpRequest::get(url)).await?;
        let body = String::from_utf8_lossy(&body);
        let candidate = extractor.extract(&body);

        if !is_address_valid(candidate) {
            warn!(url, candidate, "IP lookup returned no valid address");
            return Ok(None);
        }

        // is_address_valid guarantees the parse succeeds
        let ip = candidate.parse::<IpAddr>().ok();
        debug!(url, ip = candidate, "IP address received");
        Ok(ip)
    }

    /// Run the configured IPv4 and IPv6 lookups
    ///
    /// A lookup that answers with the wrong family counts as empty for that
    /// family. Fails with [`InvariantViolation::AddressUndiscoverable`] when
    /// both families come back empty.
    pub async fn discover_external_address(
        &self,
        config: &DiscoveryConfig,
    ) -> Result<ExternalAddress> {
        let mut address = ExternalAddress::default();

        if let Some(ref lookup) = config.ipv4 {
            let extractor = Extractor::from_lookup(lookup)?;
            address.v4 = match self.discover(&lookup.url, &extractor).await? {
                Some(IpAddr::V4(ip)) => Some(ip),
                Some(other) => {
                    warn!(url = %lookup.url, ip = %other, "IPv4 lookup returned an IPv6 address, ignoring");
                    None
                }
                None => None,
            };
        }

        if let Some(ref lookup) = config.ipv6 {
            let extractor = Extractor::from_lookup(lookup)?;
            address.v6 = match self.discover(&lookup.url, &extractor).await? {
                Some(IpAddr::V6(ip)) => Some(ip),
                Some(other) => {
                    warn!(url = %lookup.url, ip = %other, "IPv6 lookup returned an IPv4 address, ignoring");
                    None
                }
                None => None,
            };
        }

        if address.is_empty() {
            return Err(InvariantViolation::AddressUndiscoverable.into());
        }

        info!(%address, "External address discovered");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Answers each URL with a fixed body
    struct StaticBodies(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl HttpTransport for StaticBodies {
        async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>> {
            self.0
                .get(request.url.as_str())
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| Error::http_status(404, &request.url))
        }
    }

    fn discoverer(bodies: &[(&'static str, &'static str)]) -> IpDiscoverer {
        IpDiscoverer::new(Arc::new(StaticBodies(bodies.iter().copied().collect())))
    }

    #[test]
    fn test_is_address_valid() {
        assert!(is_address_valid("203.0.113.5"));
        assert!(is_address_valid("2001:db8::1"));
        assert!(!is_address_valid(""));
        assert!(!is_address_valid("203.0.113"));
        assert!(!is_address_valid("256.0.0.1"));
        assert!(!is_address_valid("example.com"));
        assert!(!is_address_valid(" 203.0.113.5"));
    }

    #[test]
    fn test_plain_body_trimming() {
        assert_eq!(Extractor::PlainBody.extract(" 203.0.113.5 \r\n"), "203.0.113.5");
        assert_eq!(Extractor::PlainBody.extract("\r\n"), "");
        // tabs are not part of the trim set
        assert_eq!(Extractor::PlainBody.extract("\t203.0.113.5"), "\t203.0.113.5");
    }

    #[test]
    fn test_pattern_extraction() {
        let extractor = Extractor::from_lookup(&LookupConfig::yandex_v4()).unwrap();
        assert_eq!(extractor.extract("IPv4: 203.0.113.5\n"), "203.0.113.5");
        assert_eq!(
            extractor.extract("IPv4: 203.0.113.5\nIPv4: 198.51.100.7\n"),
            "203.0.113.5"
        );
        assert_eq!(extractor.extract("nothing here"), "");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = Extractor::from_lookup(&LookupConfig::with_pattern("https://x.test/", "(")).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[tokio::test]
    async fn test_discover_plain_body() {
        let d = discoverer(&[("http://ip.test/raw", " 203.0.113.5 \r\n")]);
        let ip = d.discover("http://ip.test/raw", &Extractor::PlainBody).await.unwrap();
        assert_eq!(ip, Some(IpAddr::from([203, 0, 113, 5])));
    }

    #[tokio::test]
    async fn test_discover_invalid_body_is_empty_not_error() {
        let d = discoverer(&[("http://ip.test/raw", "<html>rate limited</html>")]);
        let ip = d.discover("http://ip.test/raw", &Extractor::PlainBody).await.unwrap();
        assert_eq!(ip, None);
    }

    #[tokio::test]
    async fn test_discover_transport_error_propagates() {
        let d = discoverer(&[]);
        let err = d.discover("http://ip.test/raw", &Extractor::PlainBody).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_discover_external_address_both_families() {
        let d = discoverer(&[
            ("https://ipv4.internet.yandex.ru/", "IPv4: 203.0.113.5\n"),
            ("https://ipv6.internet.yandex.ru/", "IPv6: 2001:db8::1\n"),
        ]);
        let config = DiscoveryConfig {
            ipv4: Some(LookupConfig::yandex_v4()),
            ipv6: Some(LookupConfig::yandex_v6()),
        };
        let address = d.discover_external_address(&config).await.unwrap();
        assert_eq!(address.v4, Some(Ipv4Addr::new(203, 0, 113, 5)));
        assert_eq!(address.v6, Some("2001:db8::1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_wrong_family_counts_as_empty() {
        let d = discoverer(&[
            ("http://v4.test/", "2001:db8::1"),
            ("http://v6.test/", "2001:db8::2"),
        ]);
        let config = DiscoveryConfig {
            ipv4: Some(LookupConfig::plain("http://v4.test/")),
            ipv6: Some(LookupConfig::plain("http://v6.test/")),
        };
        let address = d.discover_external_address(&config).await.unwrap();
        assert_eq!(address.v4, None);
        assert_eq!(address.v6, Some("2001:db8::2".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_all_lookups_empty_is_fatal() {
        let d = discoverer(&[("http://v4.test/", "")]);
        let config = DiscoveryConfig {
            ipv4: Some(LookupConfig::plain("http://v4.test/")),
            ipv6: None,
        };
        let err = d.discover_external_address(&config).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Invariant(InvariantViolation::AddressUndiscoverable)
        ));
    }

    #[test]
    fn test_external_address_display() {
        let address = ExternalAddress {
            v4: Some(Ipv4Addr::new(203, 0, 113, 5)),
            v6: None,
        };
        assert_eq!(address.to_string(), "v4=203.0.113.5 v6=-");
        assert!(!address.is_empty());
        assert!(ExternalAddress::default().is_empty());
    }
}
