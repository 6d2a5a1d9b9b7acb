//! Core traits for the DDNS updater
//!
//! This module defines the abstract interfaces the reconciler talks through.
//!
//! - [`IpSource`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Read and mutate zones and records via a provider API

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{
    DELETE_SUCCESS_STATUS, DnsProvider, NewRecord, RECORD_TYPE_A, Record, Zone,
};
