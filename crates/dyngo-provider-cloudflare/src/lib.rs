// # Cloudflare DNS Provider
//
// Keeps one A/AAAA record in a Cloudflare zone pointed at the current
// public address.
//
// ## Configuration keys
//
// | key       | required | meaning                                        |
// |-----------|----------|------------------------------------------------|
// | `token`   | yes      | API token with Zone:DNS:Edit permission        |
// | `record`  | yes      | Fully qualified name to manage                 |
// | `zone_id` | no       | Skip the zone lookup and use this zone         |
// | `ttl`     | no       | TTL for created records, `1` means "automatic" |
// | `proxied` | no       | Create records behind the Cloudflare proxy     |
// | `api_url` | no       | Override the API base URL                      |
// | `timeout` | no       | Per-request timeout (e.g. `10s`), none if unset |
//
// ## Security
//
// - API token never appears in logs or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dyngo_core::config::ProviderConfig;
use dyngo_core::fqdn::Fqdn;
use dyngo_core::reconcile::Reconciler;
use dyngo_core::traits::{
    DnsProvider, DnsProviderFactory, DnsRecord, ProviderKind, RecordApi, RecordType,
};
use dyngo_core::{Error, ProviderRegistry, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// TTL value Cloudflare interprets as "automatic"
const AUTOMATIC_TTL: u32 = 1;

/// Page size for record listing
const PER_PAGE: &str = "100";

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
}

/// Raw Cloudflare record operations
pub struct CloudflareApi {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Pre-configured zone ID; looked up by name when absent
    zone_id: Option<String>,

    /// TTL for created records
    ttl: u32,

    /// Whether created records are proxied
    proxied: bool,

    /// API base URL
    base_url: String,

    /// Per-request timeout; requests may wait forever when unset
    timeout: Option<Duration>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareApi")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Cloudflare DNS provider: [`CloudflareApi`] behind the shared reconciler
pub type CloudflareProvider = Reconciler<CloudflareApi>;

impl CloudflareApi {
    /// Create a Cloudflare API client
    ///
    /// # Errors
    ///
    /// Fails when the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::missing_key("cloudflare", "token"));
        }

        Ok(Self {
            api_token,
            zone_id: None,
            ttl: AUTOMATIC_TTL,
            proxied: false,
            base_url: CLOUDFLARE_API_BASE.to_string(),
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

    /// Use a fixed zone instead of looking it up by name
    pub fn with_zone_id(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    /// TTL for newly created records
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create records behind the Cloudflare proxy
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Talk to a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the Cloudflare envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: request failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, what, &error_text));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("{}: failed to parse response: {}", what, e))
        })?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|m| format!("{} ({})", m.message, m.code))
                .collect();
            return Err(Error::provider(
                "cloudflare",
                format!("{}: {}", what, messages.join("; ")),
            ));
        }

        Ok(envelope.result)
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

/// Map a non-success HTTP status to an error
fn status_error(status: reqwest::StatusCode, what: &str, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            what, status
        )),
        404 => Error::not_found(format!("{}: {}", what, status)),
        409 => Error::provider(
            "cloudflare",
            format!("{}: conflict, record is being changed elsewhere. Status: {}", what, status),
        ),
        429 => Error::rate_limited(format!("{}: retry later. Status: {}", what, status)),
        500..=599 => Error::provider(
            "cloudflare",
            format!("{}: Cloudflare server error (transient): {} - {}", what, status, body),
        ),
        _ => Error::provider("cloudflare", format!("{}: {} - {}", what, status, body)),
    }
}

#[async_trait]
impl RecordApi for CloudflareApi {
    /// Zone ID
    type Session = String;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloudflare
    }

    /// Resolve the zone ID
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn open(&self, fqdn: &Fqdn) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        tracing::debug!("Looking up zone ID for {}", fqdn.zone());

        let request = self
            .client
            .get(self.url("/zones"))
            .query(&[("name", fqdn.zone())]);
        let zones: Vec<Zone> = self
            .send(request, "zone lookup")
            .await?
            .unwrap_or_default();

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", fqdn.zone())))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    async fn list_records(
        &self,
        zone_id: &String,
        fqdn: &Fqdn,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .query(&[
                ("type", record_type.as_str()),
                ("name", fqdn.name()),
                ("per_page", PER_PAGE),
            ]);
        let records: Vec<Record> = self
            .send(request, "record lookup")
            .await?
            .unwrap_or_default();

        Ok(records
            .into_iter()
            .filter_map(|r| {
                let record_type = r.record_type.parse().ok()?;
                Some(DnsRecord {
                    id: r.id,
                    record_type,
                    name: r.name,
                    value: r.content,
                })
            })
            .collect())
    }

    async fn create_record(
        &self,
        zone_id: &String,
        fqdn: &Fqdn,
        record_type: RecordType,
        value: &IpAddr,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "type": record_type.as_str(),
            "name": fqdn.name(),
            "content": value.to_string(),
            "ttl": self.ttl,
            "proxied": self.proxied,
        });

        let request = self
            .client
            .post(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .json(&payload);
        self.send::<serde_json::Value>(request, "record create")
            .await?;
        Ok(())
    }

    async fn update_record(&self, zone_id: &String, record: &DnsRecord, value: &IpAddr) -> Result<()> {
        let payload = serde_json::json!({
            "type": record.record_type.as_str(),
            "content": value.to_string(),
        });

        let request = self
            .client
            .patch(self.url(&format!("/zones/{}/dns_records/{}", zone_id, record.id)))
            .json(&payload);
        self.send::<serde_json::Value>(request, "record update")
            .await?;
        Ok(())
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig, span: &tracing::Span) -> Result<Box<dyn DnsProvider>> {
        let token = config.require("token")?;
        let record = config.require("record")?;

        let mut api = CloudflareApi::new(token)?
            .with_ttl(config.parse("ttl")?.unwrap_or(AUTOMATIC_TTL))
            .with_proxied(config.parse("proxied")?.unwrap_or(false));
        if let Some(zone_id) = config.get("zone_id").filter(|z| !z.trim().is_empty()) {
            api = api.with_zone_id(zone_id);
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

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dyngo_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dyngo_provider_cloudflare::register(&registry);
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(ProviderKind::Cloudflare, Box::new(CloudflareFactory));
}
