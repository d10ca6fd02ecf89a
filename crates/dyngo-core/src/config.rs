//! Configuration types for dyngo
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading (files, environment) is left to the daemon; everything here is
//! plain `serde` data plus validation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::traits::{IpVersion, ProviderKind};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS providers to keep in sync, in order
    #[serde(default, rename = "dns_providers", alias = "providers")]
    pub providers: Vec<ProviderConfig>,

    /// Time between sync cycles (humantime, e.g. "5m")
    #[serde(default = "default_sync_interval", with = "humantime_duration")]
    pub sync_interval: Duration,

    /// Public IP discovery settings
    #[serde(default)]
    pub ip_check: IpCheckConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            sync_interval: default_sync_interval(),
            ip_check: IpCheckConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Add a provider entry
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    /// Validate the configuration
    ///
    /// Provider entries are only checked for a usable `name` here; the
    /// per-backend keys are checked by the provider factories.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::NoProviders);
        }

        for provider in &self.providers {
            provider.kind()?;
        }

        if self.sync_interval.is_zero() {
            return Err(Error::config("sync_interval must be > 0"));
        }

        self.ip_check.validate()?;

        Ok(())
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Public IP discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpCheckConfig {
    /// Whether to sync A records
    #[serde(default = "default_true")]
    pub ipv4: bool,

    /// Whether to sync AAAA records
    #[serde(default)]
    pub ipv6: bool,

    /// Echo endpoints returning an IPv4 literal
    #[serde(default = "default_ipv4_urls")]
    pub ipv4_urls: Vec<String>,

    /// Echo endpoints returning an IPv6 literal
    #[serde(default = "default_ipv6_urls")]
    pub ipv6_urls: Vec<String>,

    /// Per-request timeout. Unset means the HTTP client default (none).
    #[serde(default, with = "humantime_duration::option")]
    pub request_timeout: Option<Duration>,
}

impl IpCheckConfig {
    /// Whether discovery for `version` is enabled
    pub fn enabled(&self, version: IpVersion) -> bool {
        match version {
            IpVersion::V4 => self.ipv4,
            IpVersion::V6 => self.ipv6,
        }
    }

    /// Endpoints configured for `version`
    pub fn urls(&self, version: IpVersion) -> &[String] {
        match version {
            IpVersion::V4 => &self.ipv4_urls,
            IpVersion::V6 => &self.ipv6_urls,
        }
    }

    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<()> {
        if !self.ipv4 && !self.ipv6 {
            return Err(Error::NoAddressFamily);
        }

        for version in [IpVersion::V4, IpVersion::V6] {
            if !self.enabled(version) {
                continue;
            }
            let urls = self.urls(version);
            if urls.is_empty() {
                return Err(Error::config(format!(
                    "{} checking is enabled but no {} endpoints are configured",
                    version, version
                )));
            }
            if let Some(bad) = urls
                .iter()
                .find(|u| !u.starts_with("http://") && !u.starts_with("https://"))
            {
                return Err(Error::config(format!(
                    "IP check endpoint must use HTTP or HTTPS scheme. Got: {}",
                    bad
                )));
            }
        }

        Ok(())
    }
}

impl Default for IpCheckConfig {
    fn default() -> Self {
        Self {
            ipv4: true,
            ipv6: false,
            ipv4_urls: default_ipv4_urls(),
            ipv6_urls: default_ipv6_urls(),
            request_timeout: None,
        }
    }
}

/// One DNS provider entry: a flat map of string keys to string values
///
/// Scalar values (numbers, booleans) are accepted in the input and kept
/// in their string form. The `name` key selects the backend.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    values: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Create an empty entry for the given backend name
    pub fn new(name: impl Into<String>) -> Self {
        Self::default().with("name", name)
    }

    /// Set a key (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The configured `name`, or `"<unnamed>"` for error messages
    pub fn display_name(&self) -> &str {
        self.get("name").unwrap_or("<unnamed>")
    }

    /// Resolve the backend selected by `name`
    pub fn kind(&self) -> Result<ProviderKind> {
        let name = self
            .get("name")
            .ok_or_else(|| Error::missing_key(self.display_name(), "name"))?;
        name.parse()
    }

    /// Lookup of a key that must be present and non-empty
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::missing_key(self.display_name(), key)),
        }
    }

    /// Optional key parsed into `T`
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
                Error::config(format!(
                    "invalid value for {} in {} provider: {}",
                    key,
                    self.display_name(),
                    e
                ))
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProviderConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Secrets never show up in Debug output
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            if is_secret_key(key) {
                map.entry(key, &"<REDACTED>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

fn is_secret_key(key: &str) -> bool {
    matches!(key, "token" | "api_token" | "api_key" | "password")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ProviderConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(k, v)| (k, v.into_string())).collect())
    }
}

impl Serialize for ProviderConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sync_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_ipv4_urls() -> Vec<String> {
    [
        "https://ipv4.icanhazip.com",
        "http://whatismyip.akamai.com/",
        "https://ipv4.wtfismyip.com/text",
        "https://api.ipify.org/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ipv6_urls() -> Vec<String> {
    [
        "https://ipv6.icanhazip.com",
        "https://ipv6.wtfismyip.com/text",
        "https://api6.ipify.org/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// serde helpers for humantime durations ("90s", "5m", "1h 30m")
pub mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
