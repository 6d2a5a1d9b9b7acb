// # HTTP IP Source
//
// Resolves the host's public IPv4 address by asking an address-echo service
// (icanhazip.com by default) and parsing the plain-text body.
//
// ## Behaviour
//
// - One GET per call, no caching: every reconciliation pass sees a fresh
//   answer
// - Surrounding whitespace (the trailing newline) is trimmed before parsing
// - Anything that is not an IPv4 literal is a parse error, including an
//   IPv6 answer

use nddns_core::traits::IpSource;
use nddns_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

/// Request timeout for the echo service
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SOURCE_NAME: &str = "http";

/// HTTP-based public IP source
pub struct HttpIpSource {
    /// URL of the echo service
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Echo service URL (e.g., "https://icanhazip.com")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// URL this source queries
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_body(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transport(SOURCE_NAME, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(
                SOURCE_NAME,
                status.as_u16(),
                format!("HTTP error: {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| Error::transport(SOURCE_NAME, format!("Failed to read response: {}", e)))
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        let body = self.fetch_body().await?;
        let ip = parse_ipv4_body(&body)?;
        debug!("{} answered {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Parse an echo-service body into an IPv4 address
///
/// Leading and trailing whitespace is ignored.
pub fn parse_ipv4_body(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    text.parse()
        .map_err(|_| Error::parse("IPv4 address", text))
}
