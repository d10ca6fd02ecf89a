//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Discovering the public address of every enabled IP version
//! - Fanning each address out to every configured provider, in order
//! - Repeating that on a fixed interval
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   interval ───► │  SyncEngine  │ ───► EngineEvent (monitoring)
//!                 └──────────────┘
//!                   │          │
//!          discover │          │ sync_a_record / sync_aaaa_record
//!                   ▼          ▼
//!            ┌──────────┐  ┌─────────────┐
//!            │ IpSource │  │ DnsProvider │ × N
//!            └──────────┘  └─────────────┘
//! ```
//!
//! ## Failure isolation
//!
//! - A discovery failure skips only that IP version for the cycle.
//! - A provider failure skips only that provider for the cycle.
//! - Nothing that happens inside a cycle stops the engine.
//!
//! ## Overlapping cycles
//!
//! Each tick spawns its cycle as a background task so that a hung
//! provider never holds up the timer. Cycles are serialized: when a tick
//! fires while the previous cycle is still running, the new cycle is
//! skipped and reported as [`EngineEvent::CycleSkipped`].

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpSource, IpVersion, ProviderKind, SyncOutcome};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{Instrument, debug, error, info, trace, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        providers_count: usize,
    },

    /// A sync cycle began
    CycleStarted {
        cycle: u64,
    },

    /// A public address was discovered
    AddressDiscovered {
        version: IpVersion,
        ip: IpAddr,
    },

    /// No address could be discovered for this version
    DiscoveryFailed {
        version: IpVersion,
        error: String,
    },

    /// A provider finished syncing
    ProviderSynced {
        provider: ProviderKind,
        version: IpVersion,
        outcome: SyncOutcome,
    },

    /// A provider failed this cycle
    ProviderFailed {
        provider: ProviderKind,
        version: IpVersion,
        error: String,
    },

    /// A sync cycle finished
    CycleFinished {
        cycle: u64,
        report: CycleReport,
    },

    /// A tick fired while the previous cycle was still running
    CycleSkipped {
        cycle: u64,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Summary of one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Addresses discovered this cycle
    pub addresses: Vec<IpAddr>,
    /// IP versions whose discovery failed
    pub failed_discoveries: Vec<IpVersion>,
    /// Provider calls that succeeded
    pub succeeded: usize,
    /// Successful provider calls that changed (or handed off) a record
    pub changed: usize,
    /// Provider calls that failed
    pub failed: usize,
}

impl CycleReport {
    /// Whether every discovery and provider call succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.failed_discoveries.is_empty()
    }
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Either call [`SyncEngine::run_once()`] for a single pass, or
///    [`SyncEngine::run()`] to sync on an interval until shutdown
///
/// The engine is cheap to clone; clones share providers and the cycle lock.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    /// Public address discovery
    ip_source: Box<dyn IpSource>,

    /// Providers, in configured order
    providers: Vec<Box<dyn DnsProvider>>,

    /// Whether to sync A records
    check_ipv4: bool,

    /// Whether to sync AAAA records
    check_ipv6: bool,

    /// Time between cycles
    sync_interval: Duration,

    /// Held for the duration of a cycle
    cycle_lock: Mutex<()>,

    /// Monotonic cycle counter
    cycles: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,

    /// Logging context
    span: tracing::Span,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `providers`: DNS providers, synced in this order
    /// - `config`: interval, enabled IP versions and engine settings
    /// - `span`: parent logging context
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver), or a configuration error if
    /// there is nothing to do: no providers, or both IP versions disabled.
    pub fn new(
        ip_source: Box<dyn IpSource>,
        providers: Vec<Box<dyn DnsProvider>>,
        config: &DdnsConfig,
        span: &tracing::Span,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        if providers.is_empty() {
            return Err(Error::NoProviders);
        }
        if !config.ip_check.ipv4 && !config.ip_check.ipv6 {
            return Err(Error::NoAddressFamily);
        }
        if config.sync_interval.is_zero() {
            return Err(Error::config("sync_interval must be > 0"));
        }

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity.max(1));

        let inner = EngineInner {
            ip_source,
            providers,
            check_ipv4: config.ip_check.ipv4,
            check_ipv6: config.ip_check.ipv6,
            sync_interval: config.sync_interval,
            cycle_lock: Mutex::new(()),
            cycles: AtomicU64::new(0),
            event_tx: tx,
            span: tracing::info_span!(parent: span, "engine"),
        };

        Ok((
            Self {
                inner: Arc::new(inner),
            },
            rx,
        ))
    }

    /// Providers managed by this engine, in sync order
    pub fn provider_names(&self) -> Vec<ProviderKind> {
        self.inner.providers.iter().map(|p| p.name()).collect()
    }

    /// Run a single sync cycle
    ///
    /// Waits for a cycle already in progress to finish first.
    pub async fn run_once(&self) -> CycleReport {
        let _guard = self.inner.cycle_lock.lock().await;
        let cycle = self.inner.next_cycle();
        self.inner.run_cycle(cycle).await
    }

    /// Run the engine until SIGINT
    ///
    /// Syncs immediately, then every `sync_interval`.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// The daemon uses this to stop on SIGTERM as well as SIGINT; tests
    /// use it for controlled shutdown.
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let inner = &self.inner;

        inner.emit_event(EngineEvent::Started {
            providers_count: inner.providers.len(),
        });
        info!(
            parent: &inner.span,
            "running every {}",
            humantime::format_duration(inner.sync_interval)
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to wait for CTRL-C: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut ticker = time::interval(inner.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Detached: no cancellation of in-flight cycles
                    let _ = self.spawn_cycle();
                }

                _ = &mut shutdown => {
                    info!(parent: &inner.span, "Shutdown signal received");
                    inner.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Start one cycle in the background, unless one is still running
    fn spawn_cycle(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let span = inner.span.clone();

        tokio::spawn(
            async move {
                let cycle = inner.next_cycle();
                match inner.cycle_lock.try_lock() {
                    Ok(_guard) => {
                        inner.run_cycle(cycle).await;
                    }
                    Err(_) => {
                        warn!(cycle, "previous sync cycle still running, skipping this one");
                        inner.emit_event(EngineEvent::CycleSkipped { cycle });
                    }
                }
            }
            .instrument(span),
        )
    }
}

impl EngineInner {
    fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// One full pass over every enabled IP version and provider
    ///
    /// The caller must hold `cycle_lock`.
    async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let span = tracing::info_span!(parent: &self.span, "cycle", cycle);

        async {
            self.emit_event(EngineEvent::CycleStarted { cycle });
            let mut report = CycleReport::default();

            if self.check_ipv4 {
                self.sync_version(IpVersion::V4, &mut report).await;
            }
            if self.check_ipv6 {
                self.sync_version(IpVersion::V6, &mut report).await;
            }

            info!(
                succeeded = report.succeeded,
                changed = report.changed,
                failed = report.failed,
                "sync cycle finished"
            );
            self.emit_event(EngineEvent::CycleFinished {
                cycle,
                report: report.clone(),
            });
            report
        }
        .instrument(span)
        .await
    }

    /// Discover `version` once and push it to every provider
    async fn sync_version(&self, version: IpVersion, report: &mut CycleReport) {
        let discovered = match version {
            IpVersion::V4 => self.ip_source.discover_v4().await.map(IpAddr::V4),
            IpVersion::V6 => self.ip_source.discover_v6().await.map(IpAddr::V6),
        };

        let ip = match discovered {
            Ok(ip) => ip,
            Err(e) => {
                error!("could not get public {} address: {}", version, e);
                report.failed_discoveries.push(version);
                self.emit_event(EngineEvent::DiscoveryFailed {
                    version,
                    error: e.to_string(),
                });
                return;
            }
        };

        info!("got public {} address={}", version, ip);
        report.addresses.push(ip);
        self.emit_event(EngineEvent::AddressDiscovered { version, ip });

        for provider in &self.providers {
            let result = match ip {
                IpAddr::V4(v4) => provider.sync_a_record(v4).await,
                IpAddr::V6(v6) => provider.sync_aaaa_record(v6).await,
            };

            match result {
                Ok(outcome) => {
                    debug!(provider = %provider.name(), ?outcome, "provider synced");
                    report.succeeded += 1;
                    if outcome.changed() {
                        report.changed += 1;
                    }
                    self.emit_event(EngineEvent::ProviderSynced {
                        provider: provider.name(),
                        version,
                        outcome,
                    });
                }
                Err(e) => {
                    // Continue with other providers
                    error!(provider = %provider.name(), "failed to sync {} record: {}", version.record_type(), e);
                    report.failed += 1;
                    self.emit_event(EngineEvent::ProviderFailed {
                        provider: provider.name(),
                        version,
                        error: e.to_string(),
                    });
                }
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
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!("Event receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_report_cleanliness() {
        let mut report = CycleReport::default();
        assert!(report.is_clean());

        report.failed_discoveries.push(IpVersion::V6);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::AddressDiscovered {
            version: IpVersion::V4,
            ip: IpAddr::from([198, 51, 100, 4]),
        };
        assert_eq!(event.clone(), event);
    }
}
