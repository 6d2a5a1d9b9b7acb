//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles keep their state behind `Arc`s so a test can hand one copy to
//! the reconciler and keep another to inspect calls afterwards.

#![allow(dead_code)]

use nddns_core::config::{DdnsConfig, EngineConfig};
use nddns_core::error::{Error, Result};
use nddns_core::traits::{DnsProvider, IpSource, NewRecord, Record, Zone};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// An IpSource that plays back scripted answers, then repeats the last one
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<Result<Ipv4Addr>>>>,
    last: Arc<Mutex<Result<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
    delay: Arc<Mutex<Duration>>,
    call_times: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedIpSource {
    /// Always answer with `ip`
    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::scripted(vec![Ok(ip)])
    }

    /// Always fail with `error`
    pub fn failing(error: Error) -> Self {
        Self::scripted(vec![Err(error)])
    }

    /// Answer with each entry in turn; the last entry repeats forever
    pub fn scripted(answers: Vec<Result<Ipv4Addr>>) -> Self {
        let mut script: VecDeque<_> = answers.into();
        let last = script
            .pop_back()
            .expect("script needs at least one answer");
        Self {
            script: Arc::new(Mutex::new(script)),
            last: Arc::new(Mutex::new(last)),
            call_count: Arc::new(AtomicUsize::new(0)),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every answer take `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// When each call to current() started
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    /// Change the answer for all following calls
    pub fn set_ip(&self, ip: Ipv4Addr) {
        self.script.lock().unwrap().clear();
        *self.last.lock().unwrap() = Ok(ip);
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a new ScriptedIpSource that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            last: Arc::clone(&other.last),
            call_count: Arc::clone(&other.call_count),
            delay: Arc::clone(&other.delay),
            call_times: Arc::clone(&other.call_times),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => self.last.lock().unwrap().clone(),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A provider call, as recorded by [`MockDnsProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListZones,
    ListRecords { zone_id: String },
    Create { zone_id: String, record: NewRecord },
    Delete { zone_id: String, record_id: String },
}

/// Knobs for making the mock provider misbehave
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Transport failures to return from list_zones before succeeding
    pub list_zones_failures: usize,
    /// Transport failures to return from list_records before succeeding
    pub list_records_failures: usize,
    /// Fail every create with a transport error
    pub create_transport_error: bool,
    /// Replace the echoed value on create (the record is still stored)
    pub echo_value: Option<String>,
    /// Replace the echoed ttl on create
    pub echo_ttl: Option<u32>,
    /// Status to answer deletes with (204 when unset)
    pub delete_status: Option<u16>,
}

/// An in-memory DNS provider that records every call
pub struct MockDnsProvider {
    zones: Arc<Mutex<Vec<Zone>>>,
    records: Arc<Mutex<Vec<(String, Record)>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    faults: Arc<Mutex<Faults>>,
    next_id: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    /// A provider with the given zones and no records
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: Arc::new(Mutex::new(zones)),
            records: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            faults: Arc::new(Mutex::new(Faults::default())),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// A provider with a single zone
    pub fn with_zone(zone_id: &str, name: &str) -> Self {
        Self::new(vec![zone(zone_id, name)])
    }

    /// Seed an existing record in a zone
    pub fn seed_record(&self, zone_id: &str, id: &str, hostname: &str, value: &str) {
        self.records.lock().unwrap().push((
            zone_id.to_string(),
            Record {
                id: id.to_string(),
                hostname: hostname.to_string(),
                value: value.to_string(),
                ttl: Some(300),
                record_type: Some("A".to_string()),
            },
        ));
    }

    /// Replace the zone listing
    pub fn set_zones(&self, zones: Vec<Zone>) {
        *self.zones.lock().unwrap() = zones;
    }

    /// Configure faults
    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }

    /// Records currently stored for a hostname, in zone order
    pub fn records_for(&self, hostname: &str) -> Vec<Record> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.hostname == hostname)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the create and delete calls
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create { .. } | Call::Delete { .. }))
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Create a new MockDnsProvider that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            zones: Arc::clone(&other.zones),
            records: Arc::clone(&other.records),
            calls: Arc::clone(&other.calls),
            faults: Arc::clone(&other.faults),
            next_id: Arc::clone(&other.next_id),
        }
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.record_call(Call::ListZones);
        let mut faults = self.faults.lock().unwrap();
        if faults.list_zones_failures > 0 {
            faults.list_zones_failures -= 1;
            return Err(Error::status("mock", 503, "service unavailable"));
        }
        Ok(self.zones.lock().unwrap().clone())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>> {
        self.record_call(Call::ListRecords {
            zone_id: zone_id.to_string(),
        });
        let mut faults = self.faults.lock().unwrap();
        if faults.list_records_failures > 0 {
            faults.list_records_failures -= 1;
            return Err(Error::transport("mock", "connection reset"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(zone, _)| zone == zone_id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn create_record(&self, zone_id: &str, record: &NewRecord) -> Result<Record> {
        self.record_call(Call::Create {
            zone_id: zone_id.to_string(),
            record: record.clone(),
        });
        let faults = self.faults.lock().unwrap().clone();
        if faults.create_transport_error {
            return Err(Error::transport("mock", "connection reset"));
        }

        let stored = Record {
            id: format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            hostname: record.hostname.clone(),
            value: record.value.to_string(),
            ttl: Some(record.ttl),
            record_type: Some(record.record_type().to_string()),
        };
        self.records
            .lock()
            .unwrap()
            .push((zone_id.to_string(), stored.clone()));

        let mut echo = stored;
        if let Some(value) = faults.echo_value {
            echo.value = value;
        }
        if let Some(ttl) = faults.echo_ttl {
            echo.ttl = Some(ttl);
        }
        Ok(echo)
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<u16> {
        self.record_call(Call::Delete {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
        });
        let status = self.faults.lock().unwrap().delete_status.unwrap_or(204);
        if status == 204 {
            self.records
                .lock()
                .unwrap()
                .retain(|(zone, r)| !(zone == zone_id && r.id == record_id));
        }
        Ok(status)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Build a zone
pub fn zone(id: &str, name: &str) -> Zone {
    Zone {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// Helper to create a configuration for testing
///
/// No retry delay and a short poll interval so loop tests finish quickly.
pub fn test_config(domain: &str, subdomain: &str) -> DdnsConfig {
    DdnsConfig::new("test-token", domain)
        .with_subdomain(subdomain)
        .with_ttl(300)
        .with_poll_interval(Duration::from_millis(20))
        .with_engine(EngineConfig {
            max_retries: 2,
            retry_delay: Duration::ZERO,
            event_channel_capacity: 1000,
            ..EngineConfig::default()
        })
}

/// Drain every event currently queued
pub fn drain_events(
    rx: &mut tokio::sync::mpsc::Receiver<nddns_core::EngineEvent>,
) -> Vec<nddns_core::EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
