//! DNS record repository
//!
//! Fetches the record set of a domain from the PDD API and validates the
//! envelope before anything else looks at it:
//!
//! 1. the envelope `error` field is empty
//! 2. the echoed `domain` equals the requested domain
//! 3. the record list is not empty
//!
//! Checks run in that order and the first violation aborts the run.

pub mod schema;

use crate::config::SyncConfig;
use crate::error::{Error, InvariantViolation, Result};
use crate::traits::{HttpRequest, HttpTransport};
use schema::{EditResponse, ListResponse, WireRecord};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Provider command used to list records
pub const LIST_COMMAND: &str = "dns/list";

/// Provider command used to edit a record
pub const EDIT_COMMAND: &str = "dns/edit";

/// DNS record type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Srv,
    Soa,
    Other(String),
}

impl RecordType {
    /// Parse the provider's type string. Unknown types are kept verbatim.
    pub fn parse(s: &str) -> Self {
        match s {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "SRV" => RecordType::Srv,
            "SOA" => RecordType::Soa,
            other => RecordType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Soa => "SOA",
            RecordType::Other(s) => s,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS record as known to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-assigned identity
    pub record_id: u64,
    pub fqdn: String,
    pub record_type: RecordType,
    /// Current value
    pub content: String,
    pub ttl: u32,
    pub domain: String,
}

impl From<WireRecord> for DnsRecord {
    fn from(wire: WireRecord) -> Self {
        Self {
            record_id: wire.record_id,
            fqdn: wire.fqdn,
            record_type: RecordType::parse(&wire.record_type),
            content: wire.content,
            ttl: wire.ttl,
            domain: wire.domain,
        }
    }
}

/// Validated record set of a domain, in provider response order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub domain: String,
    pub records: Vec<DnsRecord>,
    /// Provider `success` status string
    pub status: String,
}

impl RecordSet {
    /// Decode and validate a `dns/list` response body
    pub fn from_list_response(body: &[u8], expected_domain: &str) -> Result<Self> {
        let envelope: ListResponse =
            serde_json::from_slice(body).map_err(|e| Error::decode(LIST_COMMAND, e))?;

        if !envelope.error.is_empty() {
            return Err(Error::provider(LIST_COMMAND, envelope.error));
        }

        if envelope.domain != expected_domain {
            return Err(InvariantViolation::DomainMismatch {
                expected: expected_domain.to_string(),
                actual: envelope.domain,
            }
            .into());
        }

        if envelope.records.is_empty() {
            return Err(InvariantViolation::EmptyRecordList {
                domain: envelope.domain,
            }
            .into());
        }

        Ok(Self {
            domain: envelope.domain,
            records: envelope.records.into_iter().map(DnsRecord::from).collect(),
            status: envelope.success,
        })
    }
}

/// Provider echo of an accepted update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub domain: String,
    pub record_id: Option<u64>,
    pub record: Option<DnsRecord>,
    pub status: String,
}

/// Decode a `dns/edit` response and fail on a non-empty error field
pub fn verify_update_response(body: &[u8]) -> Result<UpdateResult> {
    let envelope: EditResponse =
        serde_json::from_slice(body).map_err(|e| Error::decode(EDIT_COMMAND, e))?;

    if !envelope.error.is_empty() {
        return Err(Error::provider(EDIT_COMMAND, envelope.error));
    }

    Ok(UpdateResult {
        domain: envelope.domain,
        record_id: envelope.record_id,
        record: envelope.record.map(DnsRecord::from),
        status: envelope.success,
    })
}

/// Reads record sets from the provider
pub struct DnsRecordRepository {
    transport: Arc<dyn HttpTransport>,
}

impl DnsRecordRepository {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Listing URL: `<api_base>/dns/list?token=<token>&domain=<domain>`
    pub fn list_url(config: &SyncConfig) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", &config.token)
            .append_pair("domain", &config.domain)
            .finish();
        format!(
            "{}/{}?{}",
            config.api_base.trim_end_matches('/'),
            LIST_COMMAND,
            query
        )
    }

    /// Fetch and validate the record set for `config.domain`
    pub async fn fetch_records(&self, config: &SyncConfig) -> Result<RecordSet> {
        debug!(domain = %config.domain, "Fetching DNS record list");

        let request = HttpRequest::get(Self::list_url(config)).with_token(&config.token);
        let body = self.transport.execute(request).await?;
        let record_set = RecordSet::from_list_response(&body, &config.domain)?;

        info!(
            domain = %record_set.domain,
            count = record_set.records.len(),
            "List of DNS records received"
        );
        Ok(record_set)
    }
}
