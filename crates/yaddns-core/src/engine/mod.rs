//! Reconciliation engine
//!
//! Drives a single synchronization run:
//!
//! ```text
//! Start ──► IpDiscovered ──► RecordsFetched ──► Reconciling ──► Done
//!   │            │                 │                 │
//!   └────────────┴─────────────────┴─────────────────┴──► FatalAbort
//! ```
//!
//! ## Record selection
//!
//! A record is eligible when its FQDN equals the configured subdomain, its
//! type is `A`, and an IPv4 address was discovered. Every eligible record
//! gets an update, one after another; the next update is not sent before the
//! previous response was verified. The first failure aborts the run.
//!
//! Updates are sent even when the record already holds the discovered
//! address, so the provider is re-told the current address on every run.
//! `skip_unchanged` turns that into a content comparison instead.
//!
//! If no record was eligible the subdomain is unknown to the provider and
//! the run fails.

use crate::config::SyncConfig;
use crate::discovery::{ExternalAddress, IpDiscoverer};
use crate::error::{InvariantViolation, Result};
use crate::repository::{self, DnsRecord, DnsRecordRepository, RecordSet, RecordType, EDIT_COMMAND};
use crate::traits::{HttpRequest, HttpTransport};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters of one `dns/edit` call
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub record_id: u64,
    pub domain: String,
    pub ttl: u32,
    pub content: String,
    pub token: String,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for UpdateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("record_id", &self.record_id)
            .field("domain", &self.domain)
            .field("ttl", &self.ttl)
            .field("content", &self.content)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl UpdateRequest {
    /// Build the update for `record` pointing it at `ip`
    pub fn for_record(record: &DnsRecord, ip: Ipv4Addr, config: &SyncConfig) -> Self {
        Self {
            record_id: record.record_id,
            domain: config.domain.clone(),
            ttl: config.ttl,
            content: ip.to_string(),
            token: config.token.clone(),
        }
    }

    /// POST to `<api_base>/dns/edit` with fields `domain, record_id, ttl, content`
    pub fn to_http_request(&self, api_base: &str) -> HttpRequest {
        let form = vec![
            ("domain".to_string(), self.domain.clone()),
            ("record_id".to_string(), self.record_id.to_string()),
            ("ttl".to_string(), self.ttl.to_string()),
            ("content".to_string(), self.content.clone()),
        ];
        let url = format!("{}/{}", api_base.trim_end_matches('/'), EDIT_COMMAND);
        HttpRequest::post(url, form).with_token(&self.token)
    }
}

/// Outcome of a successful reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records that were updated (or would have been, in dry-run mode)
    pub updated: Vec<u64>,
    /// Records skipped because their content already matched
    pub unchanged: Vec<u64>,
    pub dry_run: bool,
}

impl ReconcileReport {
    /// Whether at least one eligible record was found
    pub fn matched_any(&self) -> bool {
        !self.updated.is_empty() || !self.unchanged.is_empty()
    }
}

/// The address `record` should be pointed at, if it is eligible for an update
pub fn eligible_address(
    record: &DnsRecord,
    address: &ExternalAddress,
    config: &SyncConfig,
) -> Option<Ipv4Addr> {
    if record.fqdn != config.subdomain || record.record_type != RecordType::A {
        return None;
    }
    address.v4
}

/// Updates the records matching the configured subdomain
pub struct ReconciliationEngine {
    transport: Arc<dyn HttpTransport>,
}

impl ReconciliationEngine {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Update every eligible record in `record_set`, in response order
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: at least one eligible record, all updates verified
    /// - `Err(Error)`: first transport/decode/provider failure, or
    ///   [`InvariantViolation::SubdomainNotFound`] when nothing was eligible
    pub async fn reconcile(
        &self,
        record_set: &RecordSet,
        address: &ExternalAddress,
        config: &SyncConfig,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            dry_run: config.dry_run,
            ..Default::default()
        };

        for record in &record_set.records {
            let Some(ip) = eligible_address(record, address, config) else {
                if record.fqdn == config.subdomain {
                    debug!(
                        record_id = record.record_id,
                        record_type = %record.record_type,
                        "Record is not actionable, skipping"
                    );
                }
                continue;
            };

            if config.skip_unchanged && record.content == ip.to_string() {
                info!(
                    fqdn = %record.fqdn,
                    record_id = record.record_id,
                    ip = %ip,
                    "Record already up to date, skipping update"
                );
                report.unchanged.push(record.record_id);
                continue;
            }

            let update = UpdateRequest::for_record(record, ip, config);
            self.apply(&update, config).await?;
            info!(
                fqdn = %config.subdomain,
                record_id = record.record_id,
                ip = %ip,
                "{}",
                if config.dry_run { "[DRY-RUN] IP address would be set" } else { "IP address set" }
            );
            report.updated.push(record.record_id);
        }

        if !report.matched_any() {
            return Err(InvariantViolation::SubdomainNotFound {
                subdomain: config.subdomain.clone(),
                domain: config.domain.clone(),
            }
            .into());
        }

        Ok(report)
    }

    /// Send one update and verify the response
    async fn apply(&self, update: &UpdateRequest, config: &SyncConfig) -> Result<()> {
        let request = update.to_http_request(&config.api_base);

        if config.dry_run {
            info!(
                url = %request.url,
                body = %request.encoded_form().unwrap_or_default(),
                "[DRY-RUN] Would send update"
            );
            return Ok(());
        }

        let body = self.transport.execute(request).await?;
        let result = repository::verify_update_response(&body)?;
        debug!(record_id = ?result.record_id, status = %result.status, "Update accepted");
        Ok(())
    }
}

/// One-shot synchronization: discover, fetch, reconcile
pub struct SyncRunner {
    config: SyncConfig,
    discoverer: IpDiscoverer,
    repository: DnsRecordRepository,
    engine: ReconciliationEngine,
}

impl SyncRunner {
    /// Create a runner sharing `transport` between all stages
    pub fn new(transport: Arc<dyn HttpTransport>, config: SyncConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            discoverer: IpDiscoverer::new(transport.clone()),
            repository: DnsRecordRepository::new(transport.clone()),
            engine: ReconciliationEngine::new(transport),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run the full sequence once. Any error ends the run.
    pub async fn run(&self) -> Result<ReconcileReport> {
        info!(
            domain = %self.config.domain,
            subdomain = %self.config.subdomain,
            mode = if self.config.dry_run { "DRY-RUN" } else { "LIVE" },
            "Starting synchronization"
        );

        let address = self
            .discoverer
            .discover_external_address(&self.config.discovery)
            .await?;
        let record_set = self.repository.fetch_records(&self.config).await?;
        let report = self.engine.reconcile(&record_set, &address, &self.config).await?;

        info!(
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            "Synchronization finished"
        );
        Ok(report)
    }
}
