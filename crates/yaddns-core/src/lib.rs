// # yaddns-core
//
// Core library for the yaddns dynamic DNS synchronizer.
//
// ## Architecture Overview
//
// A run is one-shot and strictly sequential:
// - **IpDiscoverer**: finds the current external IPv4/IPv6 address
// - **DnsRecordRepository**: fetches and validates the domain's record set
// - **ReconciliationEngine**: updates the A record(s) of the target subdomain
//   and verifies every update
// - **SyncRunner**: wires the three together around one shared transport
//
// All network access goes through the [`HttpTransport`] trait, so every
// stage can be exercised against a scripted fake.
//
// ## Failure Policy
//
// Every error is fatal. There is no retry, no backoff and no partial
// success; errors propagate to the caller, which decides how to exit.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod repository;
pub mod traits;

// Re-export core types for convenience
pub use config::{DiscoveryConfig, LookupConfig, SyncConfig};
pub use discovery::{ExternalAddress, Extractor, IpDiscoverer, is_address_valid};
pub use engine::{ReconcileReport, ReconciliationEngine, SyncRunner, UpdateRequest};
pub use error::{Error, InvariantViolation, Result};
pub use repository::{DnsRecord, DnsRecordRepository, RecordSet, RecordType, UpdateResult};
pub use traits::{HttpMethod, HttpRequest, HttpTransport};
