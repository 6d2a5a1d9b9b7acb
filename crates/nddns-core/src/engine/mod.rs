//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Resolving the current public IPv4 address via IpSource
//! - Locating the provider zone for the configured domain
//! - Comparing the hostname's A record with the resolved address
//! - Creating or replacing the record via DnsProvider
//!
//! ## Architecture
//!
//! ```text
//!                 poll tick (fixed interval)
//!                           │
//!                           ▼
//!                   ┌──────────────┐
//!                   │  Reconciler  │──── EngineEvent ───▶ observers
//!                   └──────────────┘
//!                           │
//!         ┌─────────────────┼──────────────────┐
//!         ▼                 ▼                  ▼
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │  IpSource   │   │ ZoneLocator  │   │ RecordRepository │
//! │  (resolve)  │   │  (zone id)   │   │ (find/create/del)│
//! └─────────────┘   └──────────────┘   └──────────────────┘
//!                           └─────────┬────────┘
//!                                     ▼
//!                              ┌─────────────┐
//!                              │ DnsProvider │
//!                              └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Resolve the public IPv4 address
//! 2. Locate the zone id for the domain
//! 3. Find the first record whose hostname matches
//! 4. No record: create one. Same value: nothing. Different value: replace.
//!
//! A failed pass is logged and the loop waits for the next tick. Nothing is
//! carried over between passes.

use crate::config::{DdnsConfig, ReplaceStrategy};
use crate::error::{Error, Result};
use crate::records::RecordRepository;
use crate::traits::{DnsProvider, IpSource, NewRecord, Record};
use crate::zone::ZoneLocator;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// Result of a successful reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// No record existed; one was created
    Created {
        /// Address the new record points at
        ip: Ipv4Addr,
    },

    /// The record already pointed at the current address
    Unchanged {
        /// The current address
        ip: Ipv4Addr,
    },

    /// A stale record was replaced
    Replaced {
        /// Value of the stale record
        previous: String,
        /// Address the new record points at
        ip: Ipv4Addr,
    },
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Service loop started
    Started {
        hostname: String,
        poll_interval: Duration,
    },

    /// A reconciliation pass started
    PassStarted {
        pass: u64,
    },

    /// Public address resolved
    IpResolved {
        ip: Ipv4Addr,
    },

    /// Zone id found for the domain
    ZoneLocated {
        domain: String,
        zone_id: String,
    },

    /// A record was created where none existed
    RecordCreated {
        hostname: String,
        ip: Ipv4Addr,
    },

    /// The record already matched
    RecordUnchanged {
        hostname: String,
        ip: Ipv4Addr,
    },

    /// A stale record was replaced
    RecordReplaced {
        hostname: String,
        stale_record_id: String,
        previous: String,
        ip: Ipv4Addr,
    },

    /// The stale record was deleted but its replacement could not be created;
    /// the hostname has no A record until a later pass succeeds
    RecordMissing {
        hostname: String,
        deleted_record_id: String,
    },

    /// A pass finished successfully
    PassSucceeded {
        pass: u64,
        outcome: PassOutcome,
        finished_at: DateTime<Utc>,
    },

    /// A pass was aborted
    PassFailed {
        pass: u64,
        error: Error,
        finished_at: DateTime<Utc>,
    },

    /// Service loop stopped
    Stopped {
        reason: String,
    },
}

/// Core reconciler
///
/// Owns the collaborators and the immutable configuration. One call to
/// [`Reconciler::reconcile_once`] is one convergence pass; [`Reconciler::run`]
/// repeats it on the configured interval until shutdown.
///
/// ## Concurrency
///
/// Passes never overlap: the loop awaits a pass, then waits a full poll
/// interval before the next one. Slow passes stretch the cycle. Running two
/// reconcilers against the same hostname is not supported.
///
/// ## Load Resistance
///
/// Events go through a bounded channel. When it is full, events are dropped
/// (logged) rather than blocking the loop.
pub struct Reconciler {
    /// Public-IP resolver
    ip_source: Box<dyn IpSource>,

    /// DNS-zone API transport
    provider: Box<dyn DnsProvider>,

    /// Validated configuration
    config: DdnsConfig,

    /// Fully-qualified hostname, computed once
    hostname: String,

    /// Passes started so far
    passes: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `ip_source`: Public-IP resolver
    /// - `provider`: DNS provider transport
    /// - `config`: Configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);
        let hostname = config.hostname();

        let reconciler = Self {
            ip_source,
            provider,
            config,
            hostname,
            passes: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Fully-qualified hostname this reconciler manages
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The configuration this reconciler was built with
    pub fn config(&self) -> &DdnsConfig {
        &self.config
    }

    /// Run the service loop
    ///
    /// Runs a pass immediately, then sleeps one poll interval after each pass
    /// finishes, until Ctrl-C. Failed passes are logged and never end the loop.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the service loop until the given shutdown signal fires
    ///
    /// Used by the daemon (which owns signal handling) and by tests. With
    /// `None` this behaves like [`Reconciler::run`].
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        info!(
            "Starting reconciliation loop for {} (interval: {:?}, strategy: {})",
            self.hostname, self.config.poll_interval, self.config.engine.replace_strategy
        );
        self.emit_event(EngineEvent::Started {
            hostname: self.hostname.clone(),
            poll_interval: self.config.poll_interval,
        });

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    if let Err(e) = self.reconcile_once().await {
                        error!(hostname = %self.hostname, "Error occurred: {}", e);
                        // Retried on the next tick
                    }
                    // A full interval between the end of a pass and the next one
                    ticks.as_mut().reset();
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        info!("Reconciliation loop stopped");
        Ok(())
    }

    /// Run a single reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(PassOutcome)`: The hostname's record matches the public address
    /// - `Err(Error)`: The pass was aborted at the failing step
    pub async fn reconcile_once(&self) -> Result<PassOutcome> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Starting pass {}", pass);
        self.emit_event(EngineEvent::PassStarted { pass });

        let result = self.converge().await;

        match &result {
            Ok(outcome) => self.emit_event(EngineEvent::PassSucceeded {
                pass,
                outcome: outcome.clone(),
                finished_at: Utc::now(),
            }),
            Err(e) => self.emit_event(EngineEvent::PassFailed {
                pass,
                error: e.clone(),
                finished_at: Utc::now(),
            }),
        }

        result
    }

    async fn converge(&self) -> Result<PassOutcome> {
        let ip_source = self.ip_source.as_ref();
        let ip = self
            .with_retry("resolve public IP", move || ip_source.current())
            .await?;
        info!("Current IPv4: {}", ip);
        self.emit_event(EngineEvent::IpResolved { ip });

        let domain = self.config.domain.as_str();
        let locator = ZoneLocator::new(self.provider.as_ref());
        let locator = &locator;
        let zone_id = self
            .with_retry("locate zone", move || locator.find_zone_id(domain))
            .await?;
        debug!("Zone for {}: {}", domain, zone_id);
        self.emit_event(EngineEvent::ZoneLocated {
            domain: domain.to_string(),
            zone_id: zone_id.clone(),
        });

        let repo = RecordRepository::new(self.provider.as_ref());
        let repo = &repo;
        let hostname = self.hostname.as_str();
        let zone = zone_id.as_str();
        let existing = self
            .with_retry("find record", move || repo.find_record(zone, hostname))
            .await?;

        match existing {
            None => {
                info!(
                    "No DNS record found for {}. Updating to current IPv4 of: {}",
                    hostname, ip
                );
                repo.create_record(zone, hostname, ip, self.config.ttl)
                    .await?;
                info!("Created DNS A record for {} with value {}", hostname, ip);
                self.emit_event(EngineEvent::RecordCreated {
                    hostname: hostname.to_string(),
                    ip,
                });
                Ok(PassOutcome::Created { ip })
            }
            Some(record) if record.value == ip.to_string() => {
                info!("Value of record matches current IP address");
                self.emit_event(EngineEvent::RecordUnchanged {
                    hostname: hostname.to_string(),
                    ip,
                });
                Ok(PassOutcome::Unchanged { ip })
            }
            Some(stale) => {
                info!(
                    "Record value of {} differs from current IP of {}",
                    stale.value, ip
                );
                self.replace(repo, zone, stale, ip).await
            }
        }
    }

    /// Replace a stale record according to the configured strategy
    async fn replace(
        &self,
        repo: &RecordRepository<'_>,
        zone_id: &str,
        stale: Record,
        ip: Ipv4Addr,
    ) -> Result<PassOutcome> {
        let hostname = self.hostname.as_str();
        let ttl = self.config.ttl;

        // Nothing is deleted for a request that could never be created
        NewRecord::new(hostname, ip, ttl).preflight()?;

        match self.config.engine.replace_strategy {
            ReplaceStrategy::DeleteThenCreate => {
                info!("Deleting DNS record: {}", stale.id);
                repo.delete_record(zone_id, &stale.id).await?;

                info!("Creating DNS A record for {} with value {}", hostname, ip);
                if let Err(e) = repo.create_record(zone_id, hostname, ip, ttl).await {
                    error!(
                        gap = true,
                        hostname,
                        deleted_record_id = %stale.id,
                        "Stale record deleted but replacement failed; {} has no A record until the next pass: {}",
                        hostname,
                        e
                    );
                    self.emit_event(EngineEvent::RecordMissing {
                        hostname: hostname.to_string(),
                        deleted_record_id: stale.id.clone(),
                    });
                    return Err(e);
                }
            }
            ReplaceStrategy::CreateThenDelete => {
                info!("Creating DNS A record for {} with value {}", hostname, ip);
                repo.create_record(zone_id, hostname, ip, ttl).await?;

                info!("Deleting DNS record: {}", stale.id);
                if let Err(e) = repo.delete_record(zone_id, &stale.id).await {
                    warn!(
                        hostname,
                        stale_record_id = %stale.id,
                        "Replacement created but stale record could not be deleted; {} serves two A records: {}",
                        hostname,
                        e
                    );
                    return Err(e);
                }
            }
        }

        info!("Replaced {} -> {} for {}", stale.value, ip, hostname);
        self.emit_event(EngineEvent::RecordReplaced {
            hostname: hostname.to_string(),
            stale_record_id: stale.id,
            previous: stale.value.clone(),
            ip,
        });

        Ok(PassOutcome::Replaced {
            previous: stale.value,
            ip,
        })
    }

    /// Run a read-only step, retrying transport failures
    ///
    /// # Parameters
    ///
    /// - `step`: Name used in log lines
    /// - `op`: Produces a fresh attempt each time it is called
    async fn with_retry<T, F, Fut>(&self, step: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.config.engine.max_retries;
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        step,
                        attempt,
                        max_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.config.engine.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_compare_by_value() {
        let event = EngineEvent::RecordCreated {
            hostname: "home.example.com".to_string(),
            ip: Ipv4Addr::new(203, 0, 113, 9),
        };
        assert_eq!(event.clone(), event);
    }
}
