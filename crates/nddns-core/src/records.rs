//! Record repository
//!
//! Lists, creates and deletes A records in a zone through a [`DnsProvider`],
//! and applies the checks that decide whether the provider's answer counts as
//! success:
//!
//! - a create is trusted only if the echo matches the request field for field
//! - a delete is trusted only if the provider answered "no content"

use crate::error::{Error, Result};
use crate::traits::{DELETE_SUCCESS_STATUS, DnsProvider, NewRecord, RECORD_TYPE_A, Record};
use std::net::Ipv4Addr;
use tracing::debug;

/// A-record operations scoped to a zone
pub struct RecordRepository<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> RecordRepository<'a> {
    /// Create a repository over a provider
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Fetch every record in the zone
    pub async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>> {
        self.provider.list_records(zone_id).await
    }

    /// Find the record for a hostname
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Record))`: The first record (in provider order) whose
    ///   hostname equals `hostname`
    /// - `Ok(None)`: No record matched
    pub async fn find_record(&self, zone_id: &str, hostname: &str) -> Result<Option<Record>> {
        let records = self.list_records(zone_id).await?;
        let matches = records.iter().filter(|r| r.hostname == hostname).count();
        if matches > 1 {
            debug!(
                "{} records match {}, using the first one",
                matches, hostname
            );
        }
        Ok(first_match(records, hostname))
    }

    /// Create an A record and verify the provider's echo
    ///
    /// # Returns
    ///
    /// - `Ok(Record)`: The echoed record, identical to the request
    /// - `Err(Error::Config)`: The request failed preflight; nothing was sent
    /// - `Err(Error::RecordCreation)`: The echo differed in hostname, type,
    ///   value or ttl, even though the provider reported success
    pub async fn create_record(
        &self,
        zone_id: &str,
        hostname: &str,
        value: Ipv4Addr,
        ttl: u32,
    ) -> Result<Record> {
        let request = NewRecord::new(hostname, value, ttl);
        request.preflight()?;
        let echo = self.provider.create_record(zone_id, &request).await?;
        verify_echo(&request, &echo)?;
        Ok(echo)
    }

    /// Delete a record by id
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider answered "no content"
    /// - `Err(Error::RecordDeletion)`: Any other status
    pub async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let status = self.provider.delete_record(zone_id, record_id).await?;
        if status != DELETE_SUCCESS_STATUS {
            return Err(Error::RecordDeletion {
                record_id: record_id.to_string(),
                status,
            });
        }
        Ok(())
    }
}

/// The first record whose hostname exactly equals `hostname`
pub fn first_match(records: Vec<Record>, hostname: &str) -> Option<Record> {
    records.into_iter().find(|record| record.hostname == hostname)
}

/// Compare a create echo with the request that produced it
pub fn verify_echo(request: &NewRecord, echo: &Record) -> Result<()> {
    let mismatch = |field: &'static str, expected: String, actual: String| Error::RecordCreation {
        hostname: request.hostname.clone(),
        field,
        expected,
        actual,
    };

    if echo.hostname != request.hostname {
        return Err(mismatch(
            "hostname",
            request.hostname.clone(),
            echo.hostname.clone(),
        ));
    }

    if echo.record_type.as_deref() != Some(RECORD_TYPE_A) {
        return Err(mismatch(
            "type",
            RECORD_TYPE_A.to_string(),
            echo.record_type.clone().unwrap_or_default(),
        ));
    }

    let expected_value = request.value.to_string();
    if echo.value != expected_value {
        return Err(mismatch("value", expected_value, echo.value.clone()));
    }

    if echo.ttl != Some(request.ttl) {
        return Err(mismatch(
            "ttl",
            request.ttl.to_string(),
            echo.ttl.map(|ttl| ttl.to_string()).unwrap_or_default(),
        ));
    }

    Ok(())
}
