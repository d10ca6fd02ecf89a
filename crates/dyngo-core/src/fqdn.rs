//! Fully qualified domain names and their zone / record split
//!
//! By convention the zone is always the last two labels of the name.
//! Anything before that is the record name; a name with two labels or
//! fewer refers to the zone apex, written `@`.
//!
//! ```rust
//! use dyngo_core::fqdn::split;
//!
//! assert_eq!(split("test.sub.domain.com"), ("domain.com".to_string(), "test.sub".to_string()));
//! assert_eq!(split("domain.com"), ("domain.com".to_string(), "@".to_string()));
//! ```

use std::fmt;
use std::str::FromStr;

/// Record name used for the zone apex
pub const APEX: &str = "@";

/// Split a dotted name into `(zone, record_name)`
///
/// The split is purely label based. A leading empty label (as in
/// `.sub.domain.com`) is not dropped: it stays part of the record name.
pub fn split(fqdn: &str) -> (String, String) {
    let labels: Vec<&str> = fqdn.split('.').collect();
    if labels.len() > 2 {
        let at = labels.len() - 2;
        (labels[at..].join("."), labels[..at].join("."))
    } else {
        (fqdn.to_string(), APEX.to_string())
    }
}

/// A parsed FQDN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqdn {
    name: String,
    zone: String,
    record: String,
}

impl Fqdn {
    /// Parse a dotted name. Never fails; see [`split`].
    pub fn parse(name: impl Into<String>) -> Self {
        let name = name.into();
        let (zone, record) = split(&name);
        Self { name, zone, record }
    }

    /// The name as configured
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The zone (last two labels)
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// The zone-relative record name, `@` for the apex
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Whether this name is the zone apex
    pub fn is_apex(&self) -> bool {
        self.record == APEX
    }
}

impl FromStr for Fqdn {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(zone: &str, record: &str) -> (String, String) {
        (zone.to_string(), record.to_string())
    }

    #[test]
    fn test_subdomain_split() {
        assert_eq!(split("sub.domain.com"), pair("domain.com", "sub"));
    }

    #[test]
    fn test_apex_split() {
        assert_eq!(split("domain.com"), pair("domain.com", "@"));
    }

    #[test]
    fn test_multi_subdomain_split() {
        assert_eq!(split("test.sub.domain.com"), pair("domain.com", "test.sub"));
    }

    #[test]
    fn test_leading_empty_label() {
        assert_eq!(split(".sub.domain.com"), pair("domain.com", ".sub"));
    }

    #[test]
    fn test_short_leading_empty_label() {
        assert_eq!(split(".com"), pair(".com", "@"));
    }

    #[test]
    fn test_single_label() {
        assert_eq!(split("localhost"), pair("localhost", "@"));
    }

    #[test]
    fn test_fqdn_accessors() {
        let fqdn: Fqdn = "home.example.org".parse().unwrap();
        assert_eq!(fqdn.name(), "home.example.org");
        assert_eq!(fqdn.zone(), "example.org");
        assert_eq!(fqdn.record(), "home");
        assert!(!fqdn.is_apex());
        assert!(Fqdn::parse("example.org").is_apex());
        assert_eq!(fqdn.to_string(), "home.example.org");
    }

    #[test]
    fn test_zone_is_always_last_two_labels() {
        for name in ["a.b.c.d.e", "x.y.z", "deep.nested.example.co.uk"] {
            let labels: Vec<&str> = name.split('.').collect();
            let (zone, record) = split(name);
            assert_eq!(zone, labels[labels.len() - 2..].join("."));
            assert_eq!(record, labels[..labels.len() - 2].join("."));
        }
    }
}
