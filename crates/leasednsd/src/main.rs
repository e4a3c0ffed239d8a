// # leasednsd - Lease to DNS Daemon
//
// Thin integration layer: parses flags, sets up logging, registers the
// lease sources and the unbound sink, then runs the lease engine until
// SIGTERM/SIGINT. All reconciliation logic lives in leasedns-core.
//
// ## Example
//
// ```bash
// leasednsd --source /var/lib/misc/dnsmasq.leases --format dnsmasq --domain lan
//
// LEASEDNS_SOURCE=/run/slaac-resolver LEASEDNS_FORMAT=slaac \
//     leasednsd --foreground --log-level debug
// ```
//
// Detaching from the terminal is left to the service manager. Logs go to
// stderr, where the journal picks them up; without `--foreground` they are
// plain text. There is no direct syslog output.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use leasedns_core::{EngineEvent, Error, LeaseEngine, Registry, WatcherConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeasednsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<LeasednsExitCode> for ExitCode {
    fn from(code: LeasednsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl LeasednsExitCode {
    /// Classify a daemon failure
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(e) if e.is_source_unavailable() => LeasednsExitCode::ConfigError,
            Some(Error::Config(_)) => LeasednsExitCode::ConfigError,
            _ => LeasednsExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                LeasednsExitCode::ConfigError.into()
            } else {
                LeasednsExitCode::CleanShutdown.into()
            };
        }
    };

    let config = cli.watcher_config();
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return LeasednsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_ansi(cli.foreground)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return LeasednsExitCode::ConfigError.into();
    }

    info!("Starting leasednsd");
    if cli.foreground {
        info!("Running in foreground mode");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LeasednsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config, cli.pid_file.as_deref()).await {
            Ok(()) => LeasednsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                LeasednsExitCode::for_error(&e)
            }
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: WatcherConfig, pid_file: Option<&Path>) -> Result<()> {
    info!(
        "Configuration: {} source, domain '{}', trigger {:?}",
        config.source.type_name(),
        config.domain,
        config.trigger
    );

    let registry = Registry::new();
    leasedns_source_files::register(&registry);
    leasedns_sink_unbound::register(&registry);

    // A missing source at startup is a configuration problem
    if let Some(path) = config.source.path() {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::source_path(path, e))
            .context("Lease source not found")?;
    }

    let source = registry.create_source(&config.source)?;
    let sink = registry.create_sink(&config.sink)?;
    let (mut engine, mut events) = LeaseEngine::new(source, sink, config)?;

    let _pid_guard = match pid_file {
        Some(path) => Some(PidFile::create(path)?),
        None => None,
    };

    let monitor = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let result = engine.run().await;
    drop(engine);
    let _ = monitor.await;

    result?;
    info!("Shutdown complete");
    Ok(())
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::Started { scopes_count } => {
            info!("Engine started with {} scope(s)", scopes_count)
        }
        EngineEvent::SinkFailed { scope, error } => {
            warn!("Records for scope {} may be out of sync: {}", scope, error)
        }
        other => debug!("Engine event: {:?}", other),
    }
}

/// Pid file that is removed again when dropped
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: &Path) -> Result<Self> {
        std::fs::write(path, format!("{}\n", std::process::id())).map_err(|e| {
            Error::config(format!("Failed to write pid file {}: {}", path.display(), e))
        })?;
        debug!("Wrote pid file {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove pid file {}: {}", self.path.display(), e);
        }
    }
}
