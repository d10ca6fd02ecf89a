// # DigitalOcean DNS Provider
//
// Keeps one A/AAAA record in a DigitalOcean-hosted domain pointed at the
// current public address.
//
// Configuration keys: `token` and `record` (required), `ttl`, `api_url`
// and `timeout` (optional). Requests never time out unless `timeout` is set.
//
// DigitalOcean stores record names relative to the domain, with `@` for
// the apex, so `home.example.com` is record `home` in domain `example.com`.
//
// ## API Reference
//
// - List Records: GET `/v2/domains/:domain/records?type=...`
// - Create Record: POST `/v2/domains/:domain/records`
// - Update Record: PUT `/v2/domains/:domain/records/:id`

use async_trait::async_trait;
use dyngo_core::config::ProviderConfig;
use dyngo_core::fqdn::Fqdn;
use dyngo_core::reconcile::Reconciler;
use dyngo_core::traits::{
    DnsProvider, DnsProviderFactory, DnsRecord, ProviderKind, RecordApi, RecordType,
};
use dyngo_core::{Error, ProviderRegistry, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com";

/// Maximum page size the records endpoint accepts
const PER_PAGE: &str = "200";

#[derive(Debug, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    domain_records: Vec<Record>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Pages,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
}

/// DigitalOcean error body
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

/// Raw DigitalOcean record operations
pub struct DigitalOceanApi {
    /// ⚠️ NEVER log this value
    api_token: String,
    ttl: Option<u32>,
    base_url: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl std::fmt::Debug for DigitalOceanApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanApi")
            .field("api_token", &"<REDACTED>")
            .field("ttl", &self.ttl)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// DigitalOcean DNS provider: [`DigitalOceanApi`] behind the shared reconciler
pub type DigitalOceanProvider = Reconciler<DigitalOceanApi>;

impl DigitalOceanApi {
    /// Create a DigitalOcean API client
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::missing_key("digitalocean", "token"));
        }

        Ok(Self {
            api_token,
            ttl: None,
            base_url: DIGITALOCEAN_API_BASE.to_string(),
            timeout: None,
            client: build_client(None)?,
        })
    }

    /// Give up on API requests that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(Some(timeout))?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// TTL for newly created records; DigitalOcean's default when unset
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Talk to a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self, domain: &str) -> String {
        format!("{}/v2/domains/{}/records", self.base_url, domain)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: request failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) if !err.message.is_empty() => format!("{} ({})", err.message, err.id),
            _ => body,
        };

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!("{}: {} - {}", what, status, detail)),
            404 => Error::not_found(format!("{}: {} - {}", what, status, detail)),
            429 => Error::rate_limited(format!("{}: retry later. Status: {}", what, status)),
            _ => Error::provider("digitalocean", format!("{}: {} - {}", what, status, detail)),
        })
    }
}

#[async_trait]
impl RecordApi for DigitalOceanApi {
    /// Domain name
    type Session = String;

    fn kind(&self) -> ProviderKind {
        ProviderKind::DigitalOcean
    }

    async fn open(&self, fqdn: &Fqdn) -> Result<String> {
        Ok(fqdn.zone().to_string())
    }

    /// Every record of `record_type` named `fqdn.record()`, across all pages
    async fn list_records(
        &self,
        domain: &String,
        fqdn: &Fqdn,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        let mut request = self
            .client
            .get(self.records_url(domain))
            .query(&[("type", record_type.as_str()), ("per_page", PER_PAGE)]);
        let mut found = Vec::new();

        loop {
            let page: RecordsPage = self
                .send(request, "record lookup")
                .await?
                .json()
                .await
                .map_err(|e| {
                    Error::provider("digitalocean", format!("failed to parse records: {}", e))
                })?;

            tracing::debug!("{} records on page", page.domain_records.len());

            found.extend(
                page.domain_records
                    .into_iter()
                    .filter(|r| r.name == fqdn.record())
                    .filter_map(|r| {
                        Some(DnsRecord {
                            id: r.id.to_string(),
                            record_type: r.record_type.parse().ok()?,
                            name: r.name,
                            value: r.data,
                        })
                    }),
            );

            match page.links.pages.next {
                Some(next) => request = self.client.get(next),
                None => break,
            }
        }

        Ok(found)
    }

    async fn create_record(
        &self,
        domain: &String,
        fqdn: &Fqdn,
        record_type: RecordType,
        value: &IpAddr,
    ) -> Result<()> {
        let mut payload = serde_json::json!({
            "type": record_type.as_str(),
            "name": fqdn.record(),
            "data": value.to_string(),
        });
        if let Some(ttl) = self.ttl {
            payload["ttl"] = ttl.into();
        }

        let request = self.client.post(self.records_url(domain)).json(&payload);
        self.send(request, "record create").await?;
        Ok(())
    }

    async fn update_record(&self, domain: &String, record: &DnsRecord, value: &IpAddr) -> Result<()> {
        let payload = serde_json::json!({
            "type": record.record_type.as_str(),
            "data": value.to_string(),
        });

        let request = self
            .client
            .put(format!("{}/{}", self.records_url(domain), record.id))
            .json(&payload);
        self.send(request, "record update").await?;
        Ok(())
    }
}

fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// Factory for creating DigitalOcean providers
pub struct DigitalOceanFactory;

impl DnsProviderFactory for DigitalOceanFactory {
    fn create(&self, config: &ProviderConfig, span: &tracing::Span) -> Result<Box<dyn DnsProvider>> {
        let token = config.require("token")?;
        let record = config.require("record")?;

        let mut api = DigitalOceanApi::new(token)?;
        if let Some(ttl) = config.parse("ttl")? {
            api = api.with_ttl(ttl);
        }
        if let Some(base_url) = config.get("api_url") {
            api = api.with_base_url(base_url);
        }
        if let Some(timeout) = config.parse::<humantime::Duration>("timeout")? {
            api = api.with_timeout(timeout.into())?;
        }

        Ok(Box::new(Reconciler::new(api, Fqdn::parse(record), span)))
    }
}

/// Register the DigitalOcean provider with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(ProviderKind::DigitalOcean, Box::new(DigitalOceanFactory));
}
