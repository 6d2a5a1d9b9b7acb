// # Netlify DNS Provider
//
// This crate provides the Netlify DNS transport for the updater.
//
// ## Scope
//
// - One HTTP request per trait method, nothing more
// - Errors are propagated as-is; retries belong to the Reconciler
// - Answers are reported, not judged: the create echo and the delete status
//   are checked by `RecordRepository` in nddns-core
// - HTTP timeout of 30 seconds
// - Dry-run mode for safe testing
//
// ## Security Requirements
//
// - The access token NEVER appears in logs or error messages
// - Transport errors are stripped of the request URL (which carries the token)
//
// ## API Reference
//
// Netlify API v1, token passed as the `access_token` query parameter:
//
// - List zones: GET `/dns_zones`
// - List records: GET `/dns_zones/:zone_id/dns_records`
// - Create record: POST `/dns_zones/:zone_id/dns_records`
// - Delete record: DELETE `/dns_zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use nddns_core::config::Credential;
use nddns_core::traits::{DELETE_SUCCESS_STATUS, DnsProvider, NewRecord, Record, Zone};
use nddns_core::{Error, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Netlify API base URL
pub const NETLIFY_API_BASE: &str = "https://api.netlify.com/api/v1";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "netlify";

/// Body of a create request
#[derive(Debug, Serialize)]
struct CreateRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    hostname: &'a str,
    value: String,
    ttl: u32,
}

impl<'a> From<&'a NewRecord> for CreateRecordBody<'a> {
    fn from(record: &'a NewRecord) -> Self {
        Self {
            record_type: record.record_type(),
            hostname: &record.hostname,
            value: record.value.to_string(),
            ttl: record.ttl,
        }
    }
}

/// Netlify DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zones, records)
/// - Log the intended POST and DELETE requests
/// - **NOT** actually modify DNS records, answering as the API would on
///   success (the request echoed back, status 204)
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the access token.
pub struct NetlifyProvider {
    /// Netlify personal access token
    /// ⚠️ NEVER log this value
    credential: Credential,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for NetlifyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlifyProvider")
            .field("access_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl NetlifyProvider {
    /// Create a new Netlify provider
    ///
    /// # Parameters
    ///
    /// - `credential`: Netlify personal access token
    /// - `dry_run`: If true, perform GET requests but skip mutations
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: The token is empty or the HTTP client could
    ///   not be built
    pub fn new(credential: Credential, dry_run: bool) -> Result<Self> {
        if credential.is_empty() {
            return Err(Error::config("Netlify access token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credential,
            base_url: NETLIFY_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Build a request with the token and JSON content type attached
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .query(&[("access_token", self.credential.expose())])
            .header("Content-Type", "application/json")
    }

    /// Send a request, mapping connection-level failures
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| Error::transport(PROVIDER_NAME, format!("HTTP request failed: {}", e.without_url())))
    }

    /// Fail on non-2xx, otherwise decode the JSON body
    async fn read_json<T: DeserializeOwned>(&self, response: Response, operation: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(operation, status, &error_text));
        }

        let body = response.text().await.map_err(|e| {
            Error::transport(PROVIDER_NAME, format!("Failed to read response: {}", e.without_url()))
        })?;

        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a non-success status to a transport error carrying it
fn status_error(operation: &str, status: StatusCode, error_text: &str) -> Error {
    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: Invalid access token or insufficient permissions. Status: {}",
            status
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Netlify server error (transient): {} - {}", status, error_text),
        _ => format!("{} failed: {} - {}", operation, status, error_text),
    };
    Error::status(PROVIDER_NAME, status.as_u16(), message)
}

#[async_trait]
impl DnsProvider for NetlifyProvider {
    /// ```http
    /// GET /dns_zones?access_token=<token>
    /// ```
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        tracing::debug!("Listing Netlify DNS zones");
        let response = self.send(self.request(Method::GET, "/dns_zones")).await?;
        self.read_json(response, "Zone listing").await
    }

    /// ```http
    /// GET /dns_zones/:zone_id/dns_records?access_token=<token>
    /// ```
    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>> {
        tracing::debug!("Listing records of zone {}", zone_id);
        let path = format!("/dns_zones/{}/dns_records", zone_id);
        let response = self.send(self.request(Method::GET, &path)).await?;
        self.read_json(response, "Record listing").await
    }

    /// ```http
    /// POST /dns_zones/:zone_id/dns_records?access_token=<token>
    /// {"type": "A", "hostname": "...", "value": "...", "ttl": 300}
    /// ```
    async fn create_record(&self, zone_id: &str, record: &NewRecord) -> Result<Record> {
        let body = CreateRecordBody::from(record);

        if self.dry_run {
            tracing::warn!(
                "[DRY-RUN] Would create A record: {} -> {} (ttl {}) in zone {}",
                record.hostname,
                record.value,
                record.ttl,
                zone_id
            );
            return Ok(Record {
                id: "dry-run".to_string(),
                hostname: record.hostname.clone(),
                value: body.value,
                ttl: Some(record.ttl),
                record_type: Some(record.record_type().to_string()),
            });
        }

        let path = format!("/dns_zones/{}/dns_records", zone_id);
        let response = self
            .send(self.request(Method::POST, &path).json(&body))
            .await?;
        self.read_json(response, "Record creation").await
    }

    /// ```http
    /// DELETE /dns_zones/:zone_id/dns_records/:record_id?access_token=<token>
    /// ```
    ///
    /// The status is returned as observed, whatever it is.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<u16> {
        if self.dry_run {
            tracing::warn!(
                "[DRY-RUN] Would delete record {} in zone {}",
                record_id,
                zone_id
            );
            return Ok(DELETE_SUCCESS_STATUS);
        }

        let path = format!("/dns_zones/{}/dns_records/{}", zone_id, record_id);
        let response = self.send(self.request(Method::DELETE, &path)).await?;
        Ok(response.status().as_u16())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
