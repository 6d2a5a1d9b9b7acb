//! Zone lookup
//!
//! Resolves a domain name to the provider's zone id. The lookup is done fresh
//! on every pass; zone ids are never cached.

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, Zone};
use tracing::debug;

/// Finds the provider zone for a domain
pub struct ZoneLocator<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> ZoneLocator<'a> {
    /// Create a locator over a provider
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Get the zone id for a domain
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Id of the first zone whose name equals `domain`
    /// - `Err(Error::ZoneNotFound)`: No zone name matched
    /// - `Err(Error::Transport | Error::Parse)`: The listing failed
    pub async fn find_zone_id(&self, domain: &str) -> Result<String> {
        let zones = self.provider.list_zones().await?;
        debug!(
            "{} returned {} zone(s)",
            self.provider.provider_name(),
            zones.len()
        );

        let zone = select_zone(&zones, domain).ok_or_else(|| Error::zone_not_found(domain))?;
        Ok(zone.id.clone())
    }
}

/// Pick the zone for a domain out of a listing
///
/// Exact, case-sensitive match on the zone name. Duplicate names are not
/// expected; if they occur the first one in listing order wins.
pub fn select_zone<'z>(zones: &'z [Zone], domain: &str) -> Option<&'z Zone> {
    zones.iter().find(|zone| zone.name == domain)
}
