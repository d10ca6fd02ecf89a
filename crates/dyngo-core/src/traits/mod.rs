//! Core traits for dyngo
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the public IP address
//! - [`DnsProvider`]: Sync address records with a provider
//! - [`RecordApi`]: Raw record operations behind API-backed providers

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::{IpSource, IpVersion};
pub use dns_provider::{
    DnsProvider, DnsProviderFactory, DnsRecord, ProviderKind, RecordApi, RecordType, SyncOutcome,
};
