//! Plugin-based source and sink registry
//!
//! The registry allows lease sources and record sinks to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains over formats.
//!
//! ## Registration
//!
//! Implementations register themselves during initialization:
//!
//! ```rust,ignore
//! // In leasedns-source-files
//! pub fn register(registry: &Registry) {
//!     registry.register_source("dnsmasq", Box::new(DnsmasqFactory));
//! }
//! ```

use crate::config::{SinkConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::traits::{LeaseSource, LeaseSourceFactory, RecordSink, RecordSinkFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry of lease source and record sink factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered lease source factories
    sources: RwLock<HashMap<String, Box<dyn LeaseSourceFactory>>>,

    /// Registered record sink factories
    sinks: RwLock<HashMap<String, Box<dyn RecordSinkFactory>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lease source factory under a type name (e.g. "kea")
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn LeaseSourceFactory>) {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Register a record sink factory under a type name (e.g. "unbound")
    pub fn register_sink(&self, name: impl Into<String>, factory: Box<dyn RecordSinkFactory>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Create a lease source from configuration
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn LeaseSource>> {
        let type_name = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let factory = sources.get(type_name).ok_or_else(|| {
            Error::config(format!("Lease source '{}' is not registered", type_name))
        })?;
        factory.create(config)
    }

    /// Create a record sink from configuration
    pub fn create_sink(&self, config: &SinkConfig) -> Result<Box<dyn RecordSink>> {
        let type_name = config.type_name();
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        let factory = sinks.get(type_name).ok_or_else(|| {
            Error::config(format!("Record sink '{}' is not registered", type_name))
        })?;
        factory.create(config)
    }

    /// Check if a lease source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if a record sink type is registered
    pub fn has_sink(&self, name: &str) -> bool {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all registered lease sources, sorted
    pub fn list_sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
