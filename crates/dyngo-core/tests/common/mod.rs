//! Test doubles and common utilities for contract tests
//!
//! Every double keeps its counters behind `Arc` so a test can hand one
//! copy to the engine and keep another for assertions.

#![allow(dead_code)]

use async_trait::async_trait;
use dyngo_core::config::DdnsConfig;
use dyngo_core::error::{Error, Result};
use dyngo_core::fqdn::Fqdn;
use dyngo_core::traits::{
    DnsProvider, DnsRecord, IpSource, IpVersion, ProviderKind, RecordApi, RecordType,
    SyncOutcome,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An IpSource with a fixed answer per IP version
///
/// `None` makes discovery of that version fail.
#[derive(Clone)]
pub struct MockIpSource {
    v4: Option<Ipv4Addr>,
    v6: Option<Ipv6Addr>,
    delay: Option<Duration>,
    v4_calls: Arc<AtomicUsize>,
    v6_calls: Arc<AtomicUsize>,
}

impl MockIpSource {
    pub fn new(v4: Option<Ipv4Addr>, v6: Option<Ipv6Addr>) -> Self {
        Self {
            v4,
            v6,
            delay: None,
            v4_calls: Arc::new(AtomicUsize::new(0)),
            v6_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn v4_calls(&self) -> usize {
        self.v4_calls.load(Ordering::SeqCst)
    }

    pub fn v6_calls(&self) -> usize {
        self.v6_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpSource for MockIpSource {
    async fn discover(&self, version: IpVersion) -> Result<IpAddr> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let found = match version {
            IpVersion::V4 => {
                self.v4_calls.fetch_add(1, Ordering::SeqCst);
                self.v4.map(IpAddr::V4)
            }
            IpVersion::V6 => {
                self.v6_calls.fetch_add(1, Ordering::SeqCst);
                self.v6.map(IpAddr::V6)
            }
        };

        found.ok_or(Error::DiscoveryExhausted {
            family: version.to_string(),
            attempts: 3,
        })
    }
}

/// A DnsProvider that records every address it was asked to sync
#[derive(Clone)]
pub struct MockDnsProvider {
    kind: ProviderKind,
    fail: bool,
    a_calls: Arc<AtomicUsize>,
    aaaa_calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<IpAddr>>>,
}

impl MockDnsProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            fail: false,
            a_calls: Arc::new(AtomicUsize::new(0)),
            aaaa_calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider whose every call fails
    pub fn failing(kind: ProviderKind) -> Self {
        Self {
            fail: true,
            ..Self::new(kind)
        }
    }

    pub fn a_calls(&self) -> usize {
        self.a_calls.load(Ordering::SeqCst)
    }

    pub fn aaaa_calls(&self) -> usize {
        self.aaaa_calls.load(Ordering::SeqCst)
    }

    /// Addresses received, in call order
    pub fn seen(&self) -> Vec<IpAddr> {
        self.seen.lock().unwrap().clone()
    }

    fn answer(&self, ip: IpAddr) -> Result<SyncOutcome> {
        self.seen.lock().unwrap().push(ip);
        if self.fail {
            return Err(Error::provider(self.kind.as_str(), "simulated outage"));
        }
        Ok(SyncOutcome::Unchanged { current_ip: ip })
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn sync_a_record(&self, ip: Ipv4Addr) -> Result<SyncOutcome> {
        self.a_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(IpAddr::V4(ip))
    }

    async fn sync_aaaa_record(&self, ip: Ipv6Addr) -> Result<SyncOutcome> {
        self.aaaa_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(IpAddr::V6(ip))
    }

    fn name(&self) -> ProviderKind {
        self.kind
    }
}

/// An in-memory record store behind the RecordApi interface
#[derive(Clone, Default)]
pub struct MockRecordApi {
    records: Arc<Mutex<Vec<DnsRecord>>>,
    next_id: Arc<AtomicUsize>,
    fail_open: bool,
    open_calls: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

impl MockRecordApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// An API whose zone lookup always fails
    pub fn unreachable() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Seed an existing record
    pub fn with_record(self, id: &str, record_type: RecordType, name: &str, value: &str) -> Self {
        self.records.lock().unwrap().push(DnsRecord {
            id: id.to_string(),
            record_type,
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordApi for MockRecordApi {
    type Session = String;

    fn kind(&self) -> ProviderKind {
        ProviderKind::DigitalOcean
    }

    async fn open(&self, fqdn: &Fqdn) -> Result<String> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(Error::not_found(format!("zone {}", fqdn.zone())));
        }
        Ok(fqdn.zone().to_string())
    }

    async fn list_records(
        &self,
        _zone: &String,
        fqdn: &Fqdn,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        // Like a real backend, filter on name but return every type
        let _ = record_type;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == fqdn.record())
            .cloned()
            .collect())
    }

    async fn create_record(
        &self,
        _zone: &String,
        fqdn: &Fqdn,
        record_type: RecordType,
        value: &IpAddr,
    ) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.records.lock().unwrap().push(DnsRecord {
            id: format!("created-{}", id),
            record_type,
            name: fqdn.record().to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn update_record(&self, _zone: &String, record: &DnsRecord, value: &IpAddr) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| Error::not_found(record.id.clone()))?;
        existing.value = value.to_string();
        Ok(())
    }
}

/// Engine configuration with the given families and interval
pub fn engine_config(ipv4: bool, ipv6: bool, interval: Duration) -> DdnsConfig {
    let mut config = DdnsConfig::new();
    config.ip_check.ipv4 = ipv4;
    config.ip_check.ipv6 = ipv6;
    config.sync_interval = interval;
    config
}

pub fn v4(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

pub fn v6(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}
