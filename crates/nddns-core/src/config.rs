//! Configuration types for the DDNS updater
//!
//! The configuration is built once at startup, validated, and then handed to
//! the reconciler and its collaborators by value. Nothing reads it from
//! ambient global state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Address-echo service used when no URL is configured
pub const DEFAULT_IP_URL: &str = "https://icanhazip.com";

/// Default record ttl in seconds
pub const DEFAULT_TTL: u32 = 300;

/// Default time between reconciliation passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Opaque provider access token
///
/// The Debug implementation intentionally does NOT expose the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building requests only
    /// ⚠️ NEVER log this value
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<REDACTED>)")
    }
}

/// Main DDNS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Provider access token
    pub credential: Credential,

    /// Provider-managed domain (zone name), e.g. "example.com"
    pub domain: String,

    /// Optional label prepended to the domain
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Record ttl in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Time between reconciliation passes
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// URL of the address-echo service
    #[serde(default = "default_ip_url")]
    pub ip_url: String,

    /// Perform reads for real but only log mutations
    #[serde(default)]
    pub dry_run: bool,

    /// Reconciler settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a new configuration with defaults for everything but the
    /// credential and the domain
    pub fn new(credential: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            credential: Credential::new(credential),
            domain: domain.into(),
            subdomain: None,
            ttl: DEFAULT_TTL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ip_url: DEFAULT_IP_URL.to_string(),
            dry_run: false,
            engine: EngineConfig::default(),
        }
    }

    /// Set the subdomain; an empty string means "none"
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        let subdomain = subdomain.into();
        self.subdomain = (!subdomain.is_empty()).then_some(subdomain);
        self
    }

    /// Set the record ttl
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the address-echo URL
    pub fn with_ip_url(mut self, ip_url: impl Into<String>) -> Self {
        self.ip_url = ip_url.into();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the reconciler settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Fully-qualified hostname of the managed record
    pub fn hostname(&self) -> String {
        build_hostname(&self.domain, self.subdomain.as_deref())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.credential.is_empty() {
            return Err(crate::Error::config("access token cannot be empty"));
        }

        if self.domain.is_empty() {
            return Err(crate::Error::config("domain cannot be empty"));
        }

        validate_domain_name(&self.hostname())?;

        if self.ttl == 0 {
            return Err(crate::Error::config("ttl must be positive"));
        }

        if self.poll_interval.is_zero() {
            return Err(crate::Error::config("poll interval must be positive"));
        }

        if !self.ip_url.starts_with("https://") && !self.ip_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "IP echo URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip_url
            )));
        }

        self.engine.validate()
    }
}

/// Combine subdomain and domain if necessary
pub fn build_hostname(domain: &str, subdomain: Option<&str>) -> String {
    match subdomain {
        Some(sub) if !sub.is_empty() => format!("{}.{}", sub, domain),
        _ => domain.to_string(),
    }
}

/// Basic RFC 1035 shape check for a hostname
///
/// Not comprehensive, but catches the usual typos before any request is made.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "domain name too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "domain label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "domain label cannot start or end with hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// How a stale record is replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// Delete the stale record, then create the fresh one.
    /// Leaves the hostname without a record if the create fails.
    #[default]
    DeleteThenCreate,
    /// Create the fresh record, then delete the stale one.
    /// Briefly serves two A records instead of none.
    CreateThenDelete,
}

impl ReplaceStrategy {
    /// Name as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteThenCreate => "delete-then-create",
            Self::CreateThenDelete => "create-then-delete",
        }
    }
}

impl fmt::Display for ReplaceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplaceStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete-then-create" => Ok(Self::DeleteThenCreate),
            "create-then-delete" => Ok(Self::CreateThenDelete),
            other => Err(crate::Error::config(format!(
                "unknown replace strategy '{}'. Valid: delete-then-create, create-then-delete",
                other
            ))),
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Extra attempts for read-only steps that fail with a transport error
    ///
    /// Applies to resolving the IP, listing zones and listing records.
    /// Creates and deletes are never retried within a pass.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay between those attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// How a stale record is replaced
    #[serde(default)]
    pub replace_strategy: ReplaceStrategy,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            replace_strategy: ReplaceStrategy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Parse a Go-style duration such as `30m`, `90s` or `1h30m`
///
/// Accepted units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Numbers may have
/// a fractional part. A bare `0` is accepted; any other number needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, crate::Error> {
    let invalid = || crate::Error::config(format!("invalid duration '{}'", input));

    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total_secs = 0f64;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_secs = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_secs += number * unit_secs;
    }

    Duration::try_from_secs_f64(total_secs).map_err(|_| invalid())
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_ip_url() -> String {
    DEFAULT_IP_URL.to_string()
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_with_and_without_subdomain() {
        let config = DdnsConfig::new("token", "example.com");
        assert_eq!(config.hostname(), "example.com");

        let config = config.with_subdomain("home");
        assert_eq!(config.hostname(), "home.example.com");

        let config = config.with_subdomain("");
        assert_eq!(config.subdomain, None);
        assert_eq!(config.hostname(), "example.com");
    }

    #[test]
    fn defaults_match_daemon_defaults() {
        let config = DdnsConfig::new("token", "example.com");
        assert_eq!(config.ttl, 300);
        assert_eq!(config.poll_interval, Duration::from_secs(1800));
        assert_eq!(config.ip_url, "https://icanhazip.com");
        assert_eq!(
            config.engine.replace_strategy,
            ReplaceStrategy::DeleteThenCreate
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_ttl_and_interval() {
        let config = DdnsConfig::new("token", "example.com").with_ttl(0);
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let config =
            DdnsConfig::new("token", "example.com").with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn rejects_missing_token_and_bad_domain() {
        assert!(DdnsConfig::new("", "example.com").validate().is_err());
        assert!(DdnsConfig::new("token", "").validate().is_err());
        assert!(DdnsConfig::new("token", "example..com").validate().is_err());
        assert!(
            DdnsConfig::new("token", "example.com")
                .with_subdomain("-home")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn rejects_non_ascii_labels() {
        assert!(validate_domain_name("hôme.example.com").is_err());
        assert!(validate_domain_name("例え.example.com").is_err());
        assert!(validate_domain_name("xn--hme-epa.example.com").is_ok());
        assert!(
            DdnsConfig::new("token", "example.com")
                .with_subdomain("büro")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn rejects_non_http_ip_url() {
        let config = DdnsConfig::new("token", "example.com").with_ip_url("ftp://example.net");
        assert!(config.validate().is_err());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let config = DdnsConfig::new("secret_token_12345", "example.com");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_malformed_durations() {
        for input in ["", "30", "m", "10x", "-5m", "1h-5m", "abc"] {
            assert!(parse_duration(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn replace_strategy_round_trips_through_str() {
        for strategy in [
            ReplaceStrategy::DeleteThenCreate,
            ReplaceStrategy::CreateThenDelete,
        ] {
            assert_eq!(strategy.as_str().parse::<ReplaceStrategy>().unwrap(), strategy);
        }
        assert!("update-in-place".parse::<ReplaceStrategy>().is_err());
    }

    #[test]
    fn zero_event_capacity_is_rejected() {
        let engine = EngineConfig {
            event_channel_capacity: 0,
            ..EngineConfig::default()
        };
        let config = DdnsConfig::new("token", "example.com").with_engine(engine);
        assert!(config.validate().is_err());
    }
}
