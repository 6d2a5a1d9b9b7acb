// # nddns-core
//
// Core library for the Netlify dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides the reconciliation logic for keeping one hostname's
// A record pointed at the host's public IPv4 address:
// - **IpSource**: Trait for resolving the current public IPv4 address
// - **DnsProvider**: Trait for the DNS-zone API transport
// - **ZoneLocator**: Resolves the configured domain to a zone id
// - **RecordRepository**: Lists, creates and deletes A records, and checks
//   the provider's answers
// - **Reconciler**: Runs one convergence pass per poll tick
//
// ## Design Principles
//
// 1. **Separation of Concerns**: No HTTP code here; transports live in their
//    own crates behind the two traits
// 2. **Fresh State**: Every pass re-reads zones and records; nothing is cached
//    or persisted
// 3. **Typed Failures**: A closed error taxonomy, one pass aborted per failure,
//    never the process
// 4. **Library-First**: The daemon is a thin shell over this crate

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod records;
pub mod zone;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource, NewRecord, Record, Zone};
pub use engine::{EngineEvent, PassOutcome, Reconciler};
pub use config::{Credential, DdnsConfig, EngineConfig, ReplaceStrategy};
pub use error::{Error, Result};
pub use records::RecordRepository;
pub use zone::ZoneLocator;
