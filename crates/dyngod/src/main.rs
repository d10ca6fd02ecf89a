// # dyngod - dyngo daemon
//
// Thin integration layer. All sync logic lives in dyngo-core; the daemon is
// responsible for:
//
// 1. Loading configuration (see `settings`)
// 2. Installing the log subscriber
// 3. Registering providers and building them from the config
// 4. Running the sync engine once, or until SIGTERM/SIGINT
//
// ## Exit codes
//
// | code | meaning                                    |
// |------|--------------------------------------------|
// | 0    | clean shutdown                             |
// | 1    | configuration or startup error             |
// | 2    | runtime error                              |
// | 3    | no DNS providers configured                |
// | 4    | neither IPv4 nor IPv6 checking is enabled  |
// | 5    | a provider entry is missing a required key |
// | 6    | a provider entry names an unknown backend  |

mod settings;

use anyhow::Result;
use dyngo_core::{DdnsConfig, EngineEvent, Error, ProviderRegistry, SyncEngine};
use dyngo_ip_http::HttpIpSource;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DyngoExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    NoProviders = 3,
    NoAddressFamily = 4,
    MissingProviderKey = 5,
    UnknownProvider = 6,
}

impl From<DyngoExitCode> for ExitCode {
    fn from(code: DyngoExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&Error> for DyngoExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::NoProviders => DyngoExitCode::NoProviders,
            Error::NoAddressFamily => DyngoExitCode::NoAddressFamily,
            Error::MissingProviderKey { .. } => DyngoExitCode::MissingProviderKey,
            Error::UnknownProvider(_) => DyngoExitCode::UnknownProvider,
            e if e.is_config() => DyngoExitCode::ConfigError,
            _ => DyngoExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let settings = match settings::load(|key| std::env::var(key).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DyngoExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DyngoExitCode::ConfigError.into();
    }

    info!("dyngo v{}", env!("CARGO_PKG_VERSION"));
    match &settings.source {
        Some(path) => info!("config: file={}", path.display()),
        None => warn!("config: no config file found, using defaults"),
    }

    let span = tracing::info_span!("dyngod");

    let (engine, mut events) = match build_engine(&settings.config, &span) {
        Ok(built) => built,
        Err(e) => {
            error!("{}", e);
            return DyngoExitCode::from(&e).into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DyngoExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        // Events are only surfaced as debug logs here
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(?event, "engine event");
            }
        });

        if settings.run_once {
            let report = engine.run_once().await;
            if report.is_clean() {
                DyngoExitCode::CleanShutdown
            } else {
                warn!(
                    failed = report.failed,
                    failed_discoveries = report.failed_discoveries.len(),
                    "sync finished with errors"
                );
                DyngoExitCode::RuntimeError
            }
        } else if let Err(e) = run_daemon(engine).await {
            error!("Daemon error: {}", e);
            DyngoExitCode::RuntimeError
        } else {
            DyngoExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Every provider this build knows about
fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    dyngo_provider_cloudflare::register(&registry);

    #[cfg(feature = "digitalocean")]
    dyngo_provider_digitalocean::register(&registry);

    #[cfg(feature = "custom")]
    dyngo_provider_custom::register(&registry);

    registry
}

/// Validate the configuration and wire up the engine
///
/// Every error returned here is a startup error.
fn build_engine(
    config: &DdnsConfig,
    span: &tracing::Span,
) -> dyngo_core::Result<(SyncEngine, mpsc::Receiver<EngineEvent>)> {
    config.validate()?;

    let registry = build_registry();
    let providers = registry.create_providers(&config.providers, span)?;
    for provider in &providers {
        info!("dns: using provider {}", provider.name());
    }

    let ip_source = HttpIpSource::from_config(&config.ip_check, span)?;

    SyncEngine::new(Box::new(ip_source), providers, config, span)
}

/// Run the engine until SIGTERM or SIGINT
async fn run_daemon(engine: SyncEngine) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let engine_task = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    let _ = shutdown_tx.send(());

    engine_task.await??;
    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
