// # DNS Provider Trait
//
// Defines the transport-level interface to a DNS-zone API.
//
// ## Implementations
//
// - Netlify: `nddns-provider-netlify` crate
//
// ## Division of labour
//
// A provider performs exactly one API call per method and reports what the
// provider answered. It does not judge the answer: checking that a create was
// echoed faithfully and that a delete returned "no content" is done by
// `RecordRepository` in this crate, so every provider gets the same checks.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;

/// DNS record type managed by this crate
pub const RECORD_TYPE_A: &str = "A";

/// HTTP status a provider answers a successful delete with
pub const DELETE_SUCCESS_STATUS: u16 = 204;

/// A provider zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-internal zone id
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    /// Zone name, e.g. "example.com"
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

/// A DNS record as reported by the provider
///
/// Listings include every record type in the zone, so `record_type` and
/// `ttl` are optional here. A create echo is expected to carry both.
///
/// Missing or null string fields decode as `""`: one odd record must not make
/// the whole listing unreadable. An empty field never matches a hostname or
/// an address, so echo checks stay strict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Provider-internal record id
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    /// Fully-qualified hostname
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hostname: String,
    /// Record value (an IPv4 literal for A records)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Record type, e.g. "A"
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A request to create an A record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Fully-qualified hostname
    pub hostname: String,
    /// Address the record should point at
    pub value: Ipv4Addr,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl NewRecord {
    /// Create a new A record request
    pub fn new(hostname: impl Into<String>, value: Ipv4Addr, ttl: u32) -> Self {
        Self {
            hostname: hostname.into(),
            value,
            ttl,
        }
    }

    /// Always "A"
    pub fn record_type(&self) -> &'static str {
        RECORD_TYPE_A
    }

    /// Validate the request locally, before anything is sent
    ///
    /// The reconciler runs this before deleting a stale record, so a request
    /// that could never succeed does not leave the hostname without a record.
    pub fn preflight(&self) -> Result<(), crate::Error> {
        crate::config::validate_domain_name(&self.hostname)?;

        if self.ttl == 0 {
            return Err(crate::Error::config(format!(
                "ttl for {} must be positive",
                self.hostname
            )));
        }

        if self.value.is_unspecified() || self.value.is_broadcast() {
            return Err(crate::Error::config(format!(
                "refusing to point {} at {}",
                self.hostname, self.value
            )));
        }

        Ok(())
    }
}

/// Trait for DNS-zone API transports
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Allowed
/// - One HTTP call per method, to the provider's endpoint only
/// - Parsing the provider's response
/// - Mapping HTTP failures to `Error::Transport`
///
/// # Not allowed
/// - Retry or backoff (owned by the `Reconciler`)
/// - Caching zones or records between calls
/// - Deciding whether a record needs to change
/// - Logging the access token
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every zone visible to the credential
    async fn list_zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List every record in a zone (no server-side filtering)
    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>, crate::Error>;

    /// Submit a create request and return the provider's echo of it
    ///
    /// The echo is returned as-is; the caller compares it with the request.
    async fn create_record(
        &self,
        zone_id: &str,
        record: &NewRecord,
    ) -> Result<Record, crate::Error>;

    /// Submit a delete request and return the HTTP status it was answered with
    ///
    /// Only failures to complete the request are errors here. The caller
    /// decides which status counts as success.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<u16, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
