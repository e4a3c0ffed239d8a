//! CLI argument parsing using clap derive
//!
//! Every flag can also be given through a `LEASEDNS_*` environment
//! variable; the command line wins when both are set.

use clap::{Parser, ValueEnum};
use leasedns_core::config::{
    DEFAULT_DOMAIN, DEFAULT_POLL_INTERVAL_MS, SinkConfig, SourceConfig, TriggerConfig, WatcherConfig,
};
use std::path::PathBuf;
use tracing::Level;

/// Sync DHCP/SLAAC leases into Unbound's local records
#[derive(Parser, Debug)]
#[command(name = "leasednsd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Lease file, or directory of lease files
    #[arg(long, env = "LEASEDNS_SOURCE")]
    pub source: PathBuf,

    /// Format of the lease files
    #[arg(long, value_enum, env = "LEASEDNS_FORMAT")]
    pub format: Format,

    /// Domain suffix appended to lease hostnames
    #[arg(long, env = "LEASEDNS_DOMAIN", default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    /// Re-read on an interval or on file events (default depends on format)
    #[arg(long, value_enum, env = "LEASEDNS_MODE")]
    pub mode: Option<Mode>,

    /// Poll interval in milliseconds (implies --mode poll)
    #[arg(long, env = "LEASEDNS_INTERVAL")]
    pub interval: Option<u64>,

    /// Path to unbound-control
    #[arg(long, env = "LEASEDNS_CONTROL_PATH", default_value = "/usr/sbin/unbound-control")]
    pub control_path: PathBuf,

    /// Timeout for one unbound-control call, in seconds
    #[arg(long, env = "LEASEDNS_CONTROL_TIMEOUT", default_value_t = 10)]
    pub control_timeout: u64,

    /// Log records instead of calling unbound-control
    #[arg(long, env = "LEASEDNS_DRY_RUN")]
    pub dry_run: bool,

    /// Log verbosity
    #[arg(long, value_enum, env = "LEASEDNS_LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Run attached to a terminal (colored log output)
    #[arg(long, env = "LEASEDNS_FOREGROUND")]
    pub foreground: bool,

    /// Write the process id to this file while running
    #[arg(long, env = "LEASEDNS_PID_FILE")]
    pub pid_file: Option<PathBuf>,
}

/// Lease file formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Dnsmasq,
    Kea,
    Networkd,
    Slaac,
}

/// Reconciliation trigger
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Poll,
    Watch,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl Cli {
    fn source_config(&self) -> SourceConfig {
        let path = self.source.clone();
        match self.format {
            Format::Dnsmasq => SourceConfig::Dnsmasq { path },
            Format::Kea => SourceConfig::Kea { path },
            Format::Networkd => SourceConfig::Networkd { path },
            Format::Slaac => SourceConfig::Slaac { path },
        }
    }

    fn trigger(&self, source: &SourceConfig) -> TriggerConfig {
        let default = source.default_trigger();
        let default_interval = match default {
            TriggerConfig::Poll { interval_ms } => interval_ms,
            TriggerConfig::Watch => DEFAULT_POLL_INTERVAL_MS,
        };

        match (self.mode, self.interval) {
            (Some(Mode::Watch), _) => TriggerConfig::Watch,
            (Some(Mode::Poll), interval) => TriggerConfig::Poll {
                interval_ms: interval.unwrap_or(default_interval),
            },
            (None, Some(interval_ms)) => TriggerConfig::Poll { interval_ms },
            (None, None) => default,
        }
    }

    /// Build the watcher configuration these flags describe
    pub fn watcher_config(&self) -> WatcherConfig {
        let source = self.source_config();
        let trigger = self.trigger(&source);

        WatcherConfig::new(source)
            .with_domain(self.domain.clone())
            .with_trigger(trigger)
            .with_sink(SinkConfig::Unbound {
                control_path: self.control_path.clone(),
                add_command: "local_datas".to_string(),
                remove_command: "local_datas_remove".to_string(),
                timeout_secs: self.control_timeout,
                dry_run: self.dry_run,
            })
    }
}
