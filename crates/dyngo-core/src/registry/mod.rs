//! Provider registry
//!
//! Maps the closed set of [`ProviderKind`]s to the factories that build
//! them, so the daemon never needs an if-else chain over backend names.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dyngo_core::registry::ProviderRegistry;
//! use dyngo_core::config::ProviderConfig;
//!
//! let registry = ProviderRegistry::new();
//! dyngo_provider_cloudflare::register(&registry);
//!
//! let config = ProviderConfig::new("cloudflare")
//!     .with("token", "...")
//!     .with("record", "home.example.com");
//! let provider = registry.create_provider(&config, &tracing::Span::current())?;
//! ```
//!
//! ## Registration
//!
//! Provider crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider(ProviderKind::Cloudflare, Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, ProviderKind};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Provider registry
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<ProviderKind, Box<dyn DnsProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// Registering the same kind twice replaces the earlier factory.
    pub fn register_provider(&self, kind: ProviderKind, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(kind, factory);
    }

    /// Create a DNS provider from one configuration entry
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error::UnknownProvider)`: `name` is not a known backend
    /// - `Err(Error::MissingProviderKey)`: a required key is absent
    /// - `Err(Error::Config)`: the backend is known but was not registered
    pub fn create_provider(
        &self,
        config: &ProviderConfig,
        span: &tracing::Span,
    ) -> Result<Box<dyn DnsProvider>> {
        let kind = config.kind()?;
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = providers.get(&kind).ok_or_else(|| {
            Error::config(format!("provider '{}' is not available in this build", kind))
        })?;

        factory.create(config, span)
    }

    /// Create every configured provider, in order
    ///
    /// Fails on the first entry that cannot be built.
    pub fn create_providers(
        &self,
        configs: &[ProviderConfig],
        span: &tracing::Span,
    ) -> Result<Vec<Box<dyn DnsProvider>>> {
        configs
            .iter()
            .map(|config| self.create_provider(config, span))
            .collect()
    }

    /// List all registered provider kinds
    pub fn list_providers(&self) -> Vec<ProviderKind> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.keys().copied().collect()
    }

    /// Check if a provider kind is registered
    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(&kind)
    }
}
