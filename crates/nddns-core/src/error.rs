//! Error types for the DDNS updater
//!
//! Every collaborator of a reconciliation pass fails with one of the variants
//! below. Variants carry the structured context (domain, hostname, record id,
//! status) so that log lines and tests can look at fields instead of message
//! text.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS updater
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request could not be completed, or the response was unreadable
    /// or had a non-success status
    #[error("{source_name} transport error: {message}")]
    Transport {
        /// Which collaborator failed (e.g. "http", "netlify")
        source_name: String,
        /// Human-readable cause, never contains the access token
        message: String,
        /// HTTP status, when the failure was a status code
        status: Option<u16>,
    },

    /// Malformed IP text or malformed JSON
    #[error("failed to parse {what}: {input:?}")]
    Parse {
        /// What was being parsed (e.g. "IPv4 address")
        what: String,
        /// The raw input (or parser message for JSON)
        input: String,
    },

    /// No zone name exactly equals the configured domain
    #[error("no zone found for domain {domain}")]
    ZoneNotFound {
        /// The configured domain
        domain: String,
    },

    /// The provider's create response did not echo the requested record
    #[error("failed to create record for {hostname}: {field} mismatch (requested {expected:?}, provider returned {actual:?})")]
    RecordCreation {
        /// The hostname that was being created
        hostname: String,
        /// First field that differed ("hostname", "type", "value" or "ttl")
        field: &'static str,
        /// Requested value
        expected: String,
        /// Echoed value (empty if the provider omitted the field)
        actual: String,
    },

    /// The provider answered a delete with anything but "no content"
    #[error("failed to delete DNS record {record_id}, got status code {status}")]
    RecordDeletion {
        /// The record that was being deleted
        record_id: String,
        /// Observed HTTP status
        status: u16,
    },

    /// Invalid configuration (startup only)
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a transport error without a status code
    pub fn transport(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a transport error for a non-success HTTP status
    pub fn status(source_name: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a parse error
    pub fn parse(what: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            input: input.into(),
        }
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(domain: impl Into<String>) -> Self {
        Self::ZoneNotFound {
            domain: domain.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying the same request might succeed
    ///
    /// Only transport failures qualify. Parse errors and provider answers
    /// that were understood but wrong will not change on a retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("JSON", err.to_string())
    }
}
