// # IP Source Trait
//
// Defines the interface for discovering the host's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP address-echo service: `nddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use nddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current().await?;
//     println!("public IPv4: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public-IP resolvers
///
/// One call to [`IpSource::current`] is one resolution attempt. The
/// reconciler asks once per pass and decides about retries itself.
///
/// # Allowed
/// - One outbound request per call
/// - Parsing the answer into an [`Ipv4Addr`]
///
/// # Not allowed
/// - Caching the address between calls (every pass must see fresh data)
/// - Retrying or sleeping (owned by the `Reconciler`)
/// - Spawning tasks
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current address
    /// - `Err(Error::Transport)`: The request failed or the body was unreadable
    /// - `Err(Error::Parse)`: The body was not an IPv4 literal
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Name of the source (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
