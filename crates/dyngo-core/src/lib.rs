// # dyngo-core
//
// Core library for the dyngo dynamic DNS client.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering the public IPv4/IPv6 address
// - **DnsProvider**: Trait for syncing A/AAAA records with a provider
// - **RecordApi**: Trait for the raw list/create/update calls of API-backed providers
// - **reconcile**: The create/update/no-op decision shared by API-backed providers
// - **SyncEngine**: Discover once per cycle, fan out to every provider
// - **ProviderRegistry**: Factory lookup by provider name
//
// ## Design Principles
//
// 1. Discovery and provider failures are isolated per cycle
// 2. Providers are looked up by kind, never by if-else over names
// 3. All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod fqdn;
pub mod reconcile;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource, IpVersion, ProviderKind, RecordApi, RecordType, SyncOutcome};
pub use engine::{CycleReport, EngineEvent, SyncEngine};
pub use registry::ProviderRegistry;
pub use config::{DdnsConfig, IpCheckConfig, ProviderConfig};
pub use error::{Error, Result};
pub use fqdn::Fqdn;
pub use reconcile::Reconciler;
