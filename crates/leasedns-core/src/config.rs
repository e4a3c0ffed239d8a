//! Configuration types for the lease reconciliation system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default domain suffix appended to lease hostnames
pub const DEFAULT_DOMAIN: &str = "lan";

/// Poll interval for formats without a faster default (in milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Main watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Lease source configuration
    pub source: SourceConfig,

    /// Record sink configuration
    #[serde(default)]
    pub sink: SinkConfig,

    /// Domain suffix for forward records
    #[serde(default = "default_domain")]
    pub domain: String,

    /// How reconciliation passes are triggered
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl WatcherConfig {
    /// Create a configuration for a source with default sink and trigger
    pub fn new(source: SourceConfig) -> Self {
        let trigger = source.default_trigger();
        Self {
            source,
            sink: SinkConfig::default(),
            domain: default_domain(),
            trigger,
            engine: EngineConfig::default(),
        }
    }

    /// Set the domain suffix
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the trigger mode
    pub fn with_trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = trigger;
        self
    }

    /// Set the record sink
    pub fn with_sink(mut self, sink: SinkConfig) -> Self {
        self.sink = sink;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_domain(&self.domain)?;
        self.source.validate()?;
        self.sink.validate()?;
        self.trigger.validate()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Lease source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// dnsmasq lease file (whitespace-delimited lines)
    Dnsmasq {
        /// Lease file or directory of lease files
        path: PathBuf,
    },

    /// Kea memfile lease CSV
    Kea {
        /// Lease file or directory of lease files
        path: PathBuf,
    },

    /// systemd-networkd lease JSON
    Networkd {
        /// Lease file or directory of lease files
        path: PathBuf,
    },

    /// SLAAC resolver JSON, one file per interface
    Slaac {
        /// Lease file or directory of lease files
        path: PathBuf,
    },

    /// Custom lease source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
            _ => match self.path() {
                Some(path) if !path.as_os_str().is_empty() => Ok(()),
                _ => Err(crate::Error::config("Lease source path cannot be empty")),
            },
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Dnsmasq { .. } => "dnsmasq",
            SourceConfig::Kea { .. } => "kea",
            SourceConfig::Networkd { .. } => "networkd",
            SourceConfig::Slaac { .. } => "slaac",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }

    /// Path of the lease file or directory, for built-in formats
    pub fn path(&self) -> Option<&Path> {
        match self {
            SourceConfig::Dnsmasq { path }
            | SourceConfig::Kea { path }
            | SourceConfig::Networkd { path }
            | SourceConfig::Slaac { path } => Some(path),
            SourceConfig::Custom { .. } => None,
        }
    }

    /// Trigger mode the format is usually run with
    ///
    /// SLAAC resolver files are rewritten per interface and suit change
    /// notifications; DHCP servers rewrite in place and are polled.
    pub fn default_trigger(&self) -> TriggerConfig {
        match self {
            SourceConfig::Slaac { .. } => TriggerConfig::Watch,
            SourceConfig::Dnsmasq { .. } => TriggerConfig::Poll { interval_ms: 1_000 },
            _ => TriggerConfig::default(),
        }
    }
}

/// Record sink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Unbound's control program
    Unbound {
        /// Path to the control program
        #[serde(default = "default_control_path")]
        control_path: PathBuf,
        /// Subcommand that adds a batch of records
        #[serde(default = "default_add_command")]
        add_command: String,
        /// Subcommand that removes a batch of owner names
        #[serde(default = "default_remove_command")]
        remove_command: String,
        /// Upper bound for one control invocation (in seconds)
        #[serde(default = "default_control_timeout_secs")]
        timeout_secs: u64,
        /// Log batches instead of running the control program
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom record sink
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SinkConfig {
    /// Validate the sink configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SinkConfig::Unbound {
                control_path,
                add_command,
                remove_command,
                timeout_secs,
                ..
            } => {
                if control_path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Control program path cannot be empty"));
                }
                if add_command.is_empty() || remove_command.is_empty() {
                    return Err(crate::Error::config("Control subcommands cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Control timeout must be > 0"));
                }
                Ok(())
            }
            SinkConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom sink factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the sink type name
    pub fn type_name(&self) -> &str {
        match self {
            SinkConfig::Unbound { .. } => "unbound",
            SinkConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Unbound {
            control_path: default_control_path(),
            add_command: default_add_command(),
            remove_command: default_remove_command(),
            timeout_secs: default_control_timeout_secs(),
            dry_run: false,
        }
    }
}

/// Reconciliation trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Re-read every scope on a fixed interval
    Poll {
        /// Interval between passes (in milliseconds)
        interval_ms: u64,
    },

    /// Re-read a scope when its file is created or modified
    Watch,
}

impl TriggerConfig {
    /// Validate the trigger configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            TriggerConfig::Poll { interval_ms: 0 } => {
                Err(crate::Error::config("Poll interval must be > 0"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig::Poll {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the internal event channel
    ///
    /// When full, new engine events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Validate a domain suffix (RFC 1035 style, trailing dot allowed)
pub fn validate_domain(domain: &str) -> Result<(), crate::Error> {
    let domain = domain.trim_end_matches('.');
    if domain.is_empty() {
        return Err(crate::Error::config("Domain cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain has empty label: '{}'",
                domain
            )));
        }
        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: '{}'",
                label
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters: '{}'",
                label
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_control_path() -> PathBuf {
    PathBuf::from("/usr/sbin/unbound-control")
}

fn default_add_command() -> String {
    "local_datas".to_string()
}

fn default_remove_command() -> String {
    "local_datas_remove".to_string()
}

fn default_control_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1000
}
