// # Custom Script DNS Provider
//
// Hands the address to an external executable instead of talking to a DNS
// API. The script is run once per sync as
//
// ```text
// <path> [record] <A|AAAA> <ip> <args>
// ```
//
// where `record` is omitted when not configured and `args` is the
// configured `args` string passed as a single argument. It is always
// present, empty when not configured. Exit status 0 means the
// script took care of the update; anything else is a failure carrying the
// script's stderr.
//
// There is no listing step: whether the record actually changed is up to
// the script, so every successful run reports `SyncOutcome::Delegated`.

use async_trait::async_trait;
use dyngo_core::config::ProviderConfig;
use dyngo_core::traits::{DnsProvider, DnsProviderFactory, ProviderKind, RecordType, SyncOutcome};
use dyngo_core::{Error, ProviderRegistry, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{Instrument, debug, error, info};

/// Custom script provider
#[derive(Debug)]
pub struct ScriptProvider {
    /// Executable to run
    path: PathBuf,

    /// Optional record name passed as the first argument
    record: Option<String>,

    /// Trailing argument, passed through verbatim
    args: String,

    span: tracing::Span,
}

impl ScriptProvider {
    /// Create a script provider
    ///
    /// `args` is handed to the script as one argument, never split.
    pub fn new(
        path: impl Into<PathBuf>,
        record: Option<String>,
        args: &str,
        parent: &tracing::Span,
    ) -> Self {
        let path = path.into();
        let span = tracing::info_span!(
            parent: parent,
            "provider",
            provider = %ProviderKind::Custom,
            script = %path.display()
        );

        Self {
            path,
            record,
            args: args.to_string(),
            span,
        }
    }

    /// Positional arguments for one run
    fn command_args(&self, record_type: RecordType, ip: &IpAddr) -> Vec<String> {
        let mut argv = Vec::with_capacity(4);
        if let Some(record) = &self.record {
            argv.push(record.clone());
        }
        argv.push(record_type.to_string());
        argv.push(ip.to_string());
        argv.push(self.args.clone());
        argv
    }

    async fn run(&self, ip: IpAddr) -> Result<SyncOutcome> {
        let argv = self.command_args(RecordType::for_ip(&ip), &ip);
        debug!(?argv, "running script");

        let output = Command::new(&self.path)
            .args(&argv)
            .stdin(Stdio::null())
            .output()
            .await
            .inspect_err(|e| error!("could not start script: {}", e))?;

        if output.status.success() {
            info!(%ip, "script completed");
            return Ok(SyncOutcome::Delegated { new_ip: ip });
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(status = %output.status, "script returned with errors");
        if !stderr.is_empty() {
            error!("stderr: {}", stderr);
        }

        Err(Error::ScriptExecution {
            path: self.path.display().to_string(),
            status: output.status.to_string(),
            stderr,
        })
    }
}

#[async_trait]
impl DnsProvider for ScriptProvider {
    async fn sync_a_record(&self, ip: Ipv4Addr) -> Result<SyncOutcome> {
        self.run(IpAddr::V4(ip)).instrument(self.span.clone()).await
    }

    async fn sync_aaaa_record(&self, ip: Ipv6Addr) -> Result<SyncOutcome> {
        self.run(IpAddr::V6(ip)).instrument(self.span.clone()).await
    }

    fn name(&self) -> ProviderKind {
        ProviderKind::Custom
    }
}

/// Factory for creating script providers
pub struct ScriptFactory;

impl DnsProviderFactory for ScriptFactory {
    fn create(&self, config: &ProviderConfig, span: &tracing::Span) -> Result<Box<dyn DnsProvider>> {
        let path = config.require("path")?;
        let record = config
            .get("record")
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let args = config.get("args").unwrap_or_default();

        Ok(Box::new(ScriptProvider::new(path, record, args, span)))
    }
}

/// Register the custom script provider with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(ProviderKind::Custom, Box::new(ScriptFactory));
}
