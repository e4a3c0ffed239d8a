//! Core lease engine
//!
//! The LeaseEngine is responsible for:
//! - Running one full reconciliation pass at startup
//! - Triggering further passes on a poll interval or on file events
//! - Diffing each scope's snapshot against the cache via the Reconciler
//! - Handing the resulting record batches to the RecordSink
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ LeaseSource │─── snapshot / ScopeEvent ───┐
//! └─────────────┘                             │
//!                                             ▼
//!                                    ┌──────────────┐
//!                                    │ LeaseEngine  │
//!                                    └──────────────┘
//!                                             │
//!         ┌───────────────────────────────────┼──────────────────────┐
//!         │                                   │                      │
//!         ▼                                   ▼                      ▼
//! ┌────────────────────────┐         ┌──────────────┐        ┌─────────────┐
//! │ Reconciler + LeaseCache│         │  RecordSink  │        │   Events    │
//! │ (diff)                 │         │  (apply)     │        │  (notify)   │
//! └────────────────────────┘         └──────────────┘        └─────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Trigger fires (tick, or create/modify/delete of a lease file)
//! 2. Read the scope's active snapshot from the LeaseSource
//! 3. Reconcile it against the LeaseCache (cache is updated immediately)
//! 4. If anything changed, send removals then additions to the RecordSink
//! 5. Emit an event for monitoring/logging
//!
//! One scope is processed to completion before the next one starts, and
//! the engine is the only writer of its cache.

use crate::cache::LeaseCache;
use crate::config::{TriggerConfig, WatcherConfig};
use crate::error::{Error, Result};
use crate::lease::Scope;
use crate::reconciler::Reconciler;
use crate::record::RecordDelta;
use crate::traits::{LeaseSource, RecordSink, ScopeEvent, ScopeEventStream};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Events emitted by the LeaseEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Initial pass finished
    Started {
        scopes_count: usize,
    },

    /// A scope was reconciled and its delta applied (or attempted)
    ScopeReconciled {
        scope: Scope,
        added: usize,
        removed: usize,
    },

    /// A scope's backing file was deleted and its records removed
    ScopeRemoved {
        scope: Scope,
        removed: usize,
    },

    /// The source could not be read; an empty snapshot was used
    SourceUnavailable {
        scope: Option<Scope>,
        error: String,
    },

    /// The record sink reported a failure
    SinkFailed {
        scope: Scope,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core lease engine
///
/// The engine owns the lease source, the record sink and the one
/// [`LeaseCache`] instance for the process. It runs until a shutdown
/// signal is received.
///
/// ## Lifecycle
///
/// 1. Create with [`LeaseEngine::new()`]
/// 2. Start with [`LeaseEngine::run()`]
/// 3. Engine runs until shutdown signal received
/// 4. An in-flight sink call finishes before the loop exits
///
/// ## Failure Isolation
///
/// No single scope's failure aborts the pass or the loop: unreadable
/// scopes are reconciled as empty, sink failures are logged and the cache
/// mutation for that pass stands.
pub struct LeaseEngine {
    /// Lease source for snapshots and change events
    source: Box<dyn LeaseSource>,

    /// Record sink for resolver updates
    sink: Box<dyn RecordSink>,

    /// Snapshot differ
    reconciler: Reconciler,

    /// Last applied state, keyed by scope
    cache: LeaseCache,

    /// Poll or watch
    trigger: TriggerConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl LeaseEngine {
    /// Create a new lease engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn LeaseSource>,
        sink: Box<dyn RecordSink>,
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);
        let reconciler = Reconciler::new(config.domain, source.key_strategy());

        let engine = Self {
            source,
            sink,
            reconciler,
            cache: LeaseCache::new(),
            trigger: config.trigger,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The engine's cache of applied leases
    pub fn cache(&self) -> &LeaseCache {
        &self.cache
    }

    /// Run the engine until SIGINT or SIGTERM
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The source was unavailable at startup, or the
    ///   change notification stream could not be set up
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(shutdown_signal()).await
    }

    /// Run the engine until the given oneshot fires (or its sender is dropped)
    ///
    /// Used by embedders that manage their own shutdown, and by tests.
    pub async fn run_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(async move {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn run_internal<S>(&mut self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        // Subscribe before the initial pass so no change slips between the two
        let mut events = match self.trigger {
            TriggerConfig::Watch => Some(self.source.watch()?),
            TriggerConfig::Poll { .. } => None,
        };

        let scopes_count = self.initial_pass().await?;
        self.emit_event(EngineEvent::Started { scopes_count });

        let reason = match (self.trigger, events.as_mut()) {
            (TriggerConfig::Poll { interval_ms }, _) => {
                self.poll_loop(Duration::from_millis(interval_ms), &mut shutdown)
                    .await
            }
            (TriggerConfig::Watch, Some(stream)) => self.watch_loop(stream, &mut shutdown).await?,
            (TriggerConfig::Watch, None) => {
                return Err(Error::watch("Watch trigger without an event stream"));
            }
        };

        info!("Engine stopped: {}", reason);
        self.emit_event(EngineEvent::Stopped { reason });
        Ok(())
    }

    async fn poll_loop<S>(&mut self, interval: Duration, shutdown: &mut std::pin::Pin<&mut S>) -> String
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial pass already ran
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.as_mut() => {
                    info!("Shutdown signal received");
                    return "Shutdown signal".to_string();
                }

                _ = ticker.tick() => {
                    self.poll_pass().await;
                }
            }
        }
    }

    async fn watch_loop<S>(
        &mut self,
        events: &mut ScopeEventStream,
        shutdown: &mut std::pin::Pin<&mut S>,
    ) -> Result<String>
    where
        S: Future<Output = ()>,
    {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.as_mut() => {
                    info!("Shutdown signal received");
                    return Ok("Shutdown signal".to_string());
                }

                event = events.next() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => return Err(Error::watch("Scope event stream ended")),
                }
            }
        }
    }

    /// Reconcile every scope the source currently has
    ///
    /// A source that cannot be listed at startup is fatal.
    pub async fn initial_pass(&mut self) -> Result<usize> {
        let scopes = self.source.scopes().await?;
        info!(
            "Initial pass over {} scope(s) from {} source",
            scopes.len(),
            self.source.source_name()
        );

        let now = Utc::now();
        for scope in &scopes {
            self.sync_scope_at(scope, now).await;
        }

        Ok(scopes.len())
    }

    /// Reconcile every known scope, including ones whose file disappeared
    pub async fn poll_pass(&mut self) {
        let now = Utc::now();
        let mut scopes: BTreeSet<Scope> = self.cache.scopes().into_iter().collect();

        match self.source.scopes().await {
            Ok(listed) => scopes.extend(listed),
            Err(e) => {
                warn!("Failed to list lease scopes: {}", e);
                self.emit_event(EngineEvent::SourceUnavailable {
                    scope: None,
                    error: e.to_string(),
                });
            }
        }

        for scope in &scopes {
            self.sync_scope_at(scope, now).await;
        }
    }

    /// Dispatch one filesystem event
    pub async fn handle_event(&mut self, event: ScopeEvent) {
        debug!("Scope event: {:?}", event);
        match event {
            ScopeEvent::Created(scope) | ScopeEvent::Modified(scope) => {
                self.sync_scope(&scope).await;
            }
            ScopeEvent::Deleted(scope) => {
                self.remove_scope(&scope).await;
            }
        }
    }

    /// Re-read and reconcile one scope now
    pub async fn sync_scope(&mut self, scope: &Scope) -> RecordDelta {
        self.sync_scope_at(scope, Utc::now()).await
    }

    /// Re-read and reconcile one scope at evaluation time `now`
    ///
    /// A missing backing file yields an empty snapshot. A file that exists
    /// but cannot be parsed as a whole leaves the scope untouched for this
    /// pass.
    pub async fn sync_scope_at(&mut self, scope: &Scope, now: DateTime<Utc>) -> RecordDelta {
        let snapshot = match self.source.read(scope, now).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_source_unavailable() => {
                warn!("Lease scope {} unavailable, treating as empty: {}", scope, e);
                self.emit_event(EngineEvent::SourceUnavailable {
                    scope: Some(scope.clone()),
                    error: e.to_string(),
                });
                Vec::new()
            }
            Err(e) => {
                error!("Failed to read lease scope {}: {}", scope, e);
                return RecordDelta::new();
            }
        };

        let delta = self.reconciler.reconcile(&mut self.cache, scope, &snapshot);
        if delta.changed() {
            self.apply(scope, &delta).await;
            self.emit_event(EngineEvent::ScopeReconciled {
                scope: scope.clone(),
                added: delta.added.len(),
                removed: delta.removed.len(),
            });
        } else {
            debug!("Scope {} unchanged ({} active leases)", scope, snapshot.len());
        }

        delta
    }

    /// Forget a deleted scope and remove all of its records
    pub async fn remove_scope(&mut self, scope: &Scope) -> RecordDelta {
        info!("Lease file for scope {} has been deleted", scope);
        let delta = self.reconciler.remove_scope(&mut self.cache, scope);
        if delta.changed() {
            self.apply(scope, &delta).await;
            self.emit_event(EngineEvent::ScopeRemoved {
                scope: scope.clone(),
                removed: delta.removed.len(),
            });
        }
        delta
    }

    /// Hand a delta to the sink; failures are logged, never retried
    async fn apply(&self, scope: &Scope, delta: &RecordDelta) {
        if !delta.removed.is_empty() {
            info!("Removing {} resource records for scope {}", delta.removed.len(), scope);
        }
        if !delta.added.is_empty() {
            info!("Adding {} resource records for scope {}", delta.added.len(), scope);
        }

        if let Err(e) = self.sink.apply(&delta.removed, &delta.added).await {
            error!(
                "{} sink failed to apply changes for scope {}: {}",
                self.sink.sink_name(),
                scope,
                e
            );
            self.emit_event(EngineEvent::SinkFailed {
                scope: scope.clone(),
                error: e.to_string(),
            });
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // A full channel means nobody is keeping up; drop rather than block
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            }
        }
        Err(e) => {
            warn!("Failed to set up SIGTERM handler, waiting for SIGINT only: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

/// Wait for SIGINT
#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::ScopeReconciled {
            scope: Scope::new("eth0"),
            added: 2,
            removed: 0,
        };

        assert_eq!(event.clone(), event);
        assert_ne!(
            event,
            EngineEvent::ScopeRemoved {
                scope: Scope::new("eth0"),
                removed: 2,
            }
        );
    }
}
