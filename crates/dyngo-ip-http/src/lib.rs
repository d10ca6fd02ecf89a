// # HTTP IP Source
//
// Discovers the public address by asking plain-text "what is my IP" echo
// services over HTTP(S).
//
// ## Behavior
//
// Each discovery makes up to three attempts. Every attempt picks one of
// the configured endpoints for the requested IP version at random, so a
// single dead endpoint cannot block discovery. A response is accepted when
// its trimmed body parses as an address of the requested version.

use dyngo_core::config::IpCheckConfig;
use dyngo_core::traits::{IpSource, IpVersion};
use dyngo_core::{Error, Result};

use rand::seq::SliceRandom;
use std::net::IpAddr;
use tracing::{Instrument, debug, warn};

/// Attempts per discovery before giving up
pub const MAX_ATTEMPTS: usize = 3;

/// HTTP-based IP source
pub struct HttpIpSource {
    /// Echo endpoints for IPv4
    ipv4_urls: Vec<String>,

    /// Echo endpoints for IPv6
    ipv6_urls: Vec<String>,

    /// HTTP client
    client: reqwest::Client,

    /// Logging context
    span: tracing::Span,
}

impl HttpIpSource {
    /// Create a source over explicit endpoint lists, without a request timeout
    ///
    /// Logs under the span that is current at construction.
    pub fn new(ipv4_urls: Vec<String>, ipv6_urls: Vec<String>) -> Self {
        Self {
            ipv4_urls,
            ipv6_urls,
            client: reqwest::Client::new(),
            span: tracing::Span::current(),
        }
    }

    /// Create a source from the `ip_check` configuration section
    ///
    /// Requests only time out when `request_timeout` is set.
    pub fn from_config(config: &IpCheckConfig, parent: &tracing::Span) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            ipv4_urls: config.ipv4_urls.clone(),
            ipv6_urls: config.ipv6_urls.clone(),
            client,
            span: tracing::info_span!(parent: parent, "ip_check"),
        })
    }

    fn urls(&self, version: IpVersion) -> &[String] {
        match version {
            IpVersion::V4 => &self.ipv4_urls,
            IpVersion::V6 => &self.ipv6_urls,
        }
    }

    /// One request against one endpoint
    async fn fetch_ip(&self, url: &str, version: IpVersion) -> Result<IpAddr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::http(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;
        let body = body.trim();

        let ip: IpAddr = body
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid IP address: {:?}", body)))?;

        if !version.matches(&ip) {
            return Err(Error::invalid_input(format!("Expected {}, got: {}", version, ip)));
        }

        Ok(ip)
    }

    async fn discover_with_retries(&self, version: IpVersion) -> Result<IpAddr> {
        let urls = self.urls(version);

        for attempt in 1..=MAX_ATTEMPTS {
            let Some(url) = urls.choose(&mut rand::thread_rng()).cloned() else {
                return Err(Error::config(format!("no {} check urls configured", version)));
            };

            debug!(attempt, %url, "checking public {} address", version);
            match self.fetch_ip(&url, version).await {
                Ok(ip) => return Ok(ip),
                Err(e) => {
                    warn!(attempt, %url, "{} check failed: {}", version, e);
                }
            }
        }

        Err(Error::DiscoveryExhausted {
            family: version.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn discover(&self, version: IpVersion) -> Result<IpAddr> {
        let span = tracing::debug_span!(parent: &self.span, "discover", %version);
        self.discover_with_retries(version).instrument(span).await
    }
}
