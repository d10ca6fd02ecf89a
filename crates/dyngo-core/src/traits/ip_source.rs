// # IP Source Trait
//
// Defines the interface for discovering the public IP address.
//
// ## Implementations
//
// - HTTP echo endpoints: `dyngo-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dyngo_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let v4 = source.discover_v4().await?;
//     println!("public address: {}", v4);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::traits::dns_provider::RecordType;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Version of a concrete address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Whether `ip` belongs to this version
    pub fn matches(&self, ip: &IpAddr) -> bool {
        Self::of(ip) == *self
    }

    /// DNS record type that holds addresses of this version
    pub fn record_type(&self) -> RecordType {
        match self {
            IpVersion::V4 => RecordType::A,
            IpVersion::V6 => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for IP source implementations
///
/// A source answers one question: what is the public address of this
/// host for a given IP version, right now. Every call is a fresh probe;
/// implementations must not cache results across calls.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Discover the current public address for `version`
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: an address whose version is `version`
    /// - `Err(Error::DiscoveryExhausted)`: no endpoint produced a valid address
    async fn discover(&self, version: IpVersion) -> Result<IpAddr, crate::Error>;

    /// Discover the current public IPv4 address
    async fn discover_v4(&self) -> Result<Ipv4Addr, crate::Error> {
        match self.discover(IpVersion::V4).await? {
            IpAddr::V4(ip) => Ok(ip),
            other => Err(crate::Error::invalid_input(format!(
                "IP source returned {} for an IPv4 request",
                other
            ))),
        }
    }

    /// Discover the current public IPv6 address
    async fn discover_v6(&self) -> Result<Ipv6Addr, crate::Error> {
        match self.discover(IpVersion::V6).await? {
            IpAddr::V6(ip) => Ok(ip),
            other => Err(crate::Error::invalid_input(format!(
                "IP source returned {} for an IPv6 request",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matching() {
        let v4: IpAddr = "203.0.113.7".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();

        assert!(IpVersion::V4.matches(&v4));
        assert!(!IpVersion::V4.matches(&v6));
        assert!(IpVersion::V6.matches(&v6));
        assert_eq!(IpVersion::V6.record_type(), RecordType::Aaaa);
        assert_eq!(IpVersion::V4.to_string(), "IPv4");
    }
}
