//! Wire schema of the PDD DNS API
//!
//! These types mirror the JSON envelopes exactly and are kept separate from
//! the domain entities in [`super`]. Fields the API may omit default to
//! empty values, and so does an explicit `null`; presence of the ones that
//! matter is enforced during validation, not here.

use serde::{Deserialize, Deserializer};

/// Read `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `GET dns/list` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: Vec<WireRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: String,
}

/// One record as returned by `dns/list` and echoed by `dns/edit`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireRecord {
    pub record_id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fqdn: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subdomain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ttl: u32,
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub record_type: String,
    #[serde(default)]
    pub operation: Option<String>,
}

/// `POST dns/edit` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(default)]
    pub record: Option<WireRecord>,
    #[serde(default)]
    pub record_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
}
