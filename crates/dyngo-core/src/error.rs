//! Error types for dyngo
//!
//! This module defines all error types used throughout the crate.
//! Configuration errors are fatal at startup; everything else is
//! scoped to a single provider or address family for one sync cycle.

use thiserror::Error;

/// Result type alias for dyngo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dyngo
#[derive(Error, Debug)]
pub enum Error {
    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider entry is missing one of its required keys
    #[error("Configuration error: {key} missing from {provider} provider")]
    MissingProviderKey {
        /// Provider name as configured
        provider: String,
        /// The missing key
        key: String,
    },

    /// The `name` of a provider entry is not a known backend
    #[error("Configuration error: unrecognized provider '{0}'")]
    UnknownProvider(String),

    /// No providers were configured
    #[error("Configuration error: no DNS providers configured")]
    NoProviders,

    /// Both IPv4 and IPv6 checking are disabled
    #[error("Configuration error: neither IPv4 nor IPv6 checking is enabled")]
    NoAddressFamily,

    /// No endpoint yielded a valid address within the attempt budget
    #[error("IP discovery exhausted after {attempts} attempts ({family})")]
    DiscoveryExhausted {
        /// Address family that was requested
        family: String,
        /// Number of attempts made
        attempts: usize,
    },

    /// More than one record matches the configured name and type
    #[error("Ambiguous record set: {count} {record_type} records named {name}, refusing to pick one")]
    AmbiguousRecord {
        /// Record name (provider representation)
        name: String,
        /// Record type ("A" or "AAAA")
        record_type: String,
        /// Number of matching records
        count: usize,
    },

    /// A custom script exited unsuccessfully
    #[error("Script {path} failed ({status}): {stderr}")]
    ScriptExecution {
        /// Path to the executable
        path: String,
        /// Exit status description
        status: String,
        /// Captured, trimmed stderr
        stderr: String,
    },

    /// IO errors (spawning scripts, reading files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Resource not found (zone, record)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing-key configuration error
    pub fn missing_key(provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingProviderKey {
            provider: provider.into(),
            key: key.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error can only happen while building the configuration
    ///
    /// Configuration errors are fatal; all others are per-cycle.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingProviderKey { .. }
                | Self::UnknownProvider(_)
                | Self::NoProviders
                | Self::NoAddressFamily
        )
    }
}
