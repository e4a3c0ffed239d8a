//! Test doubles and common utilities for contract tests
//!
//! This module provides a scripted lease source the test can rewrite
//! between passes and a sink that records every batch it receives.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use leasedns_core::config::{SourceConfig, TriggerConfig, WatcherConfig};
use leasedns_core::error::{Error, Result};
use leasedns_core::lease::{KeyStrategy, Lease, Scope};
use leasedns_core::record::ResourceRecord;
use leasedns_core::snapshot::active_snapshot;
use leasedns_core::traits::{LeaseSource, RecordSink, ScopeEvent, ScopeEventStream};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

type ScopeMap = Arc<Mutex<BTreeMap<Scope, Vec<Lease>>>>;
type ScopeSet = Arc<Mutex<BTreeSet<Scope>>>;

/// A lease source whose content is scripted by the test
pub struct ScriptedSource {
    leases: ScopeMap,
    broken: ScopeSet,
    available: Arc<AtomicBool>,
    key_strategy: KeyStrategy,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<ScopeEvent>>>>,
    read_count: Arc<AtomicUsize>,
}

/// Test-side control over a [`ScriptedSource`]
#[derive(Clone)]
pub struct SourceHandle {
    leases: ScopeMap,
    broken: ScopeSet,
    available: Arc<AtomicBool>,
    event_tx: mpsc::UnboundedSender<ScopeEvent>,
    read_count: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(key_strategy: KeyStrategy) -> (Self, SourceHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let leases: ScopeMap = Arc::new(Mutex::new(BTreeMap::new()));
        let broken: ScopeSet = Arc::new(Mutex::new(BTreeSet::new()));
        let available = Arc::new(AtomicBool::new(true));
        let read_count = Arc::new(AtomicUsize::new(0));

        let source = Self {
            leases: Arc::clone(&leases),
            broken: Arc::clone(&broken),
            available: Arc::clone(&available),
            key_strategy,
            event_rx: Arc::new(Mutex::new(Some(event_rx))),
            read_count: Arc::clone(&read_count),
        };
        let handle = SourceHandle {
            leases,
            broken,
            available,
            event_tx,
            read_count,
        };

        (source, handle)
    }
}

impl SourceHandle {
    /// Replace the raw content of a scope (creating it if needed)
    pub fn set_scope(&self, scope: &str, leases: Vec<Lease>) {
        self.broken.lock().unwrap().remove(&Scope::new(scope));
        self.leases.lock().unwrap().insert(Scope::new(scope), leases);
    }

    /// Make a scope's "file" unparsable as a whole
    pub fn set_parse_error(&self, scope: &str) {
        self.broken.lock().unwrap().insert(Scope::new(scope));
    }

    /// Remove a scope's backing "file"
    pub fn delete_scope(&self, scope: &str) {
        self.leases.lock().unwrap().remove(&Scope::new(scope));
    }

    /// Make the whole source unreadable (or readable again)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Deliver a filesystem event to the engine
    pub fn emit(&self, event: ScopeEvent) {
        self.event_tx.send(event).expect("engine is watching");
    }

    /// Number of read() calls so far
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LeaseSource for ScriptedSource {
    async fn scopes(&self) -> Result<Vec<Scope>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(unavailable("/scripted"));
        }
        Ok(self.leases.lock().unwrap().keys().cloned().collect())
    }

    async fn read(&self, scope: &Scope, now: DateTime<Utc>) -> Result<Vec<Lease>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(unavailable(scope.as_str()));
        }
        if self.broken.lock().unwrap().contains(scope) {
            return Err(Error::source_parse(scope.as_str(), "not a JSON array"));
        }
        let raw = self
            .leases
            .lock()
            .unwrap()
            .get(scope)
            .cloned()
            .ok_or_else(|| unavailable(scope.as_str()))?;
        Ok(active_snapshot(raw, now, self.key_strategy))
    }

    fn watch(&self) -> Result<ScopeEventStream> {
        let rx = self
            .event_rx
            .lock()
            .unwrap()
            .take()
            .expect("watch() can only be called once");
        Ok(Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx)))
    }

    fn key_strategy(&self) -> KeyStrategy {
        self.key_strategy
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

fn unavailable(path: &str) -> Error {
    Error::source_path(
        path,
        std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    )
}

/// One call to [`RecordSink::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCall {
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

/// A sink that records every batch and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, as add lines
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Make subsequent calls fail after being recorded
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordSink for RecordingSink {
    async fn apply(&self, removed: &[ResourceRecord], added: &[ResourceRecord]) -> Result<()> {
        self.calls.lock().unwrap().push(SinkCall {
            removed: removed.iter().map(ResourceRecord::add_line).collect(),
            added: added.iter().map(ResourceRecord::add_line).collect(),
        });

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::sink_apply("control program exited with status 1"));
        }
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

/// A sink whose apply takes `delay` and records when it started and finished
#[derive(Clone)]
pub struct SlowSink {
    delay: std::time::Duration,
    started: Arc<tokio::sync::Notify>,
    completed: Arc<AtomicUsize>,
}

impl SlowSink {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            delay,
            started: Arc::new(tokio::sync::Notify::new()),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolves once an apply call is in flight
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Number of apply calls that ran to completion
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordSink for SlowSink {
    async fn apply(&self, _removed: &[ResourceRecord], _added: &[ResourceRecord]) -> Result<()> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "slow"
    }
}

/// A lease expiring `expires_in` seconds from now (`None`: never)
pub fn lease(scope: &str, hostname: &str, address: &str, expires_in: Option<i64>) -> Lease {
    Lease::new(
        Scope::new(scope),
        hostname,
        address.parse().expect("valid test address"),
        expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
    )
}

/// Configuration for the scripted source with the given trigger
pub fn config(trigger: TriggerConfig) -> WatcherConfig {
    WatcherConfig::new(SourceConfig::Custom {
        factory: "scripted".to_string(),
        config: serde_json::json!({}),
    })
    .with_domain("lan")
    .with_trigger(trigger)
}

pub fn poll_config(interval_ms: u64) -> WatcherConfig {
    config(TriggerConfig::Poll { interval_ms })
}

pub fn watch_config() -> WatcherConfig {
    config(TriggerConfig::Watch)
}

/// Wait (bounded) for the first engine event matching `pred`, skipping others
pub async fn wait_for<F>(
    events: &mut mpsc::Receiver<leasedns_core::EngineEvent>,
    mut pred: F,
) -> leasedns_core::EngineEvent
where
    F: FnMut(&leasedns_core::EngineEvent) -> bool,
{
    let deadline = std::time::Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match events.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("engine event channel closed"),
            }
        }
    })
    .await
    .expect("expected engine event within 5 seconds")
}
