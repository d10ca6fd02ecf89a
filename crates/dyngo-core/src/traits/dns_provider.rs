// # DNS Provider Trait
//
// Defines the interface for bringing provider-side address records in
// line with the observed public IP.
//
// ## Implementations
//
// - DigitalOcean: `dyngo-provider-digitalocean` crate
// - Cloudflare: `dyngo-provider-cloudflare` crate
// - Custom script hook: `dyngo-provider-custom` crate
//
// API-backed providers do not implement `DnsProvider` directly. They
// implement the lower level `RecordApi` and get wrapped in a
// `Reconciler`, which owns the create / update / no-op decision.
//
// ## Usage
//
// ```rust,ignore
// use dyngo_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     provider.sync_a_record("192.0.2.10".parse()?).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::config::ProviderConfig;
use crate::fqdn::Fqdn;

/// Address record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Wire representation, `"A"` or `"AAAA"`
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Record type able to hold `ip`
    pub fn for_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::invalid_input(format!(
                "unsupported record type: {}",
                other
            ))),
        }
    }
}

/// The closed set of supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    DigitalOcean,
    Cloudflare,
    Custom,
}

impl ProviderKind {
    /// Name used in configuration (`name = "..."`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::DigitalOcean => "digitalocean",
            ProviderKind::Cloudflare => "cloudflare",
            ProviderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "digitalocean" => Ok(ProviderKind::DigitalOcean),
            "cloudflare" => Ok(ProviderKind::Cloudflare),
            "custom" => Ok(ProviderKind::Custom),
            _ => Err(crate::Error::UnknownProvider(s.to_string())),
        }
    }
}

/// Result of a successful sync call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Record already had the correct address (no-op)
    Unchanged {
        /// The current IP address
        current_ip: IpAddr,
    },
    /// Record was created (didn't exist before)
    Created {
        /// The created IP address
        new_ip: IpAddr,
    },
    /// Record was edited in place
    Updated {
        /// The value the record held before
        previous: String,
        /// The new IP address
        new_ip: IpAddr,
    },
    /// The address was handed to an external hook which owns the decision
    Delegated {
        /// The address passed along
        new_ip: IpAddr,
    },
}

impl SyncOutcome {
    /// Whether the provider side was (potentially) modified
    pub fn changed(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged { .. })
    }
}

/// A record as observed on the provider side
///
/// Fetched fresh on every reconciliation pass, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider handle for the record
    pub id: String,
    /// Record type
    pub record_type: RecordType,
    /// Record name, in the provider's own representation
    pub name: String,
    /// Record content
    pub value: String,
}

impl DnsRecord {
    /// Whether the record already points at `ip`
    ///
    /// Values are compared as addresses when they parse, so that
    /// differently formatted IPv6 literals compare equal.
    pub fn points_to(&self, ip: &IpAddr) -> bool {
        match self.value.trim().parse::<IpAddr>() {
            Ok(current) => current == *ip,
            Err(_) => self.value == ip.to_string(),
        }
    }
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Idempotency
///
/// Calling a sync method twice with the same address must leave the
/// provider unchanged after the first successful call.
///
/// # Errors
///
/// Any error is scoped to this provider for the current cycle. The
/// engine logs it and moves on to the next provider; providers must not
/// retry on their own.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Make the configured A record point at `ip`
    async fn sync_a_record(&self, ip: Ipv4Addr) -> Result<SyncOutcome, crate::Error>;

    /// Make the configured AAAA record point at `ip`
    async fn sync_aaaa_record(&self, ip: Ipv6Addr) -> Result<SyncOutcome, crate::Error>;

    /// Backend identifier (for logging/debugging)
    fn name(&self) -> ProviderKind;
}

/// Low level record operations of an API-backed provider
///
/// Implementations perform exactly one API round trip per method (plus
/// pagination) and make no decisions of their own. The decision table
/// lives in [`crate::reconcile`].
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Authenticated handle scoped to one zone, valid for one pass
    type Session: Send + Sync;

    /// Backend identifier
    fn kind(&self) -> ProviderKind;

    /// Authenticate and resolve the zone. Safe to call on every pass.
    async fn open(&self, fqdn: &Fqdn) -> Result<Self::Session, crate::Error>;

    /// List records of `record_type` whose name matches `fqdn`
    async fn list_records(
        &self,
        session: &Self::Session,
        fqdn: &Fqdn,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a new record for `fqdn`
    async fn create_record(
        &self,
        session: &Self::Session,
        fqdn: &Fqdn,
        record_type: RecordType,
        value: &IpAddr,
    ) -> Result<(), crate::Error>;

    /// Change the content of an existing record, keeping its id
    async fn update_record(
        &self,
        session: &Self::Session,
        record: &DnsRecord,
        value: &IpAddr,
    ) -> Result<(), crate::Error>;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// Missing required keys must be reported here, not on first sync.
    ///
    /// # Parameters
    ///
    /// - `config`: key/value configuration of this provider entry
    /// - `span`: logging context the provider should record under
    fn create(
        &self,
        config: &ProviderConfig,
        span: &tracing::Span,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("digitalocean".parse::<ProviderKind>().unwrap(), ProviderKind::DigitalOcean);
        assert_eq!("Cloudflare".parse::<ProviderKind>().unwrap(), ProviderKind::Cloudflare);
        assert_eq!("custom".parse::<ProviderKind>().unwrap(), ProviderKind::Custom);

        let err = "route53".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, crate::Error::UnknownProvider(ref n) if n == "route53"));
    }

    #[test]
    fn test_record_type_wire_names() {
        assert_eq!(RecordType::A.as_str(), "A");
        assert_eq!(RecordType::Aaaa.as_str(), "AAAA");
        assert_eq!("AAAA".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert!("CNAME".parse::<RecordType>().is_err());
        assert_eq!(RecordType::for_ip(&"::1".parse().unwrap()), RecordType::Aaaa);
    }

    #[test]
    fn test_points_to_normalizes_ipv6() {
        let record = DnsRecord {
            id: "1".into(),
            record_type: RecordType::Aaaa,
            name: "home".into(),
            value: "2001:0db8:0000:0000:0000:0000:0000:0001".into(),
        };
        assert!(record.points_to(&"2001:db8::1".parse().unwrap()));
        assert!(!record.points_to(&"2001:db8::2".parse().unwrap()));
    }
}
