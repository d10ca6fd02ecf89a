//! Daemon settings: config file discovery plus environment overrides
//!
//! ## Config file
//!
//! The first existing file wins:
//!
//! 1. `$DYNGO_CONFIG` (must exist when set)
//! 2. `./config.toml`
//! 3. `$HOME/.config/dyngo/config.toml`
//! 4. `/etc/dyngo/config.toml`
//!
//! With no file at all the built-in defaults are used, which configure no
//! providers and are refused at startup.
//!
//! ## Environment
//!
//! - `DYNGO_SYNC_INTERVAL`: overrides `sync_interval` (e.g. `5m`)
//! - `DYNGO_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//! - `DYNGO_RUN_ONCE`: `true` runs a single sync pass and exits
//!
//! ## Example
//!
//! ```toml
//! sync_interval = "10m"
//!
//! [ip_check]
//! ipv4 = true
//! ipv6 = true
//!
//! [[dns_providers]]
//! name = "cloudflare"
//! token = "..."
//! record = "home.example.com"
//! ```

use anyhow::{Context, Result};
use dyngo_core::DdnsConfig;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Fully resolved daemon settings
#[derive(Debug)]
pub struct Settings {
    /// Core configuration
    pub config: DdnsConfig,
    /// File the configuration came from, if any
    pub source: Option<PathBuf>,
    /// Max log level
    pub log_level: Level,
    /// Single pass instead of service mode
    pub run_once: bool,
}

/// Config file candidates, in priority order
pub fn candidates(env: &impl Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    if let Some(explicit) = env("DYNGO_CONFIG").filter(|p| !p.is_empty()) {
        return vec![PathBuf::from(explicit)];
    }

    let mut paths = vec![PathBuf::from("config.toml")];
    if let Some(home) = env("HOME") {
        paths.push(Path::new(&home).join(".config/dyngo/config.toml"));
    }
    paths.push(PathBuf::from("/etc/dyngo/config.toml"));
    paths
}

/// Load settings using `env` for variable lookups
pub fn load(env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    let explicit = env("DYNGO_CONFIG").is_some_and(|p| !p.is_empty());
    let source = candidates(&env).into_iter().find(|p| explicit || p.is_file());

    let config = match &source {
        Some(path) => read_config(path)?,
        None => DdnsConfig::new(),
    };

    let settings = Settings {
        config,
        source,
        log_level: Level::INFO,
        run_once: false,
    };
    apply_env(settings, &env)
}

/// Parse one TOML config file
pub fn read_config(path: &Path) -> Result<DdnsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

fn apply_env(mut settings: Settings, env: &impl Fn(&str) -> Option<String>) -> Result<Settings> {
    if let Some(raw) = env("DYNGO_SYNC_INTERVAL") {
        settings.config.sync_interval = humantime::parse_duration(raw.trim())
            .with_context(|| format!("DYNGO_SYNC_INTERVAL '{}' is not a duration", raw))?;
    }

    if let Some(raw) = env("DYNGO_LOG_LEVEL") {
        settings.log_level = raw.trim().parse().map_err(|_| {
            anyhow::anyhow!(
                "DYNGO_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                raw
            )
        })?;
    }

    if let Some(raw) = env("DYNGO_RUN_ONCE") {
        settings.run_once = match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "" | "0" | "false" | "no" => false,
            _ => anyhow::bail!("DYNGO_RUN_ONCE '{}' is not a boolean", raw),
        };
    }

    Ok(settings)
}
