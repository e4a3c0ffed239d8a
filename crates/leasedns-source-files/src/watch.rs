//! Filesystem change notifications as a [`ScopeEvent`] stream
//!
//! A non-recursive `notify` watcher is placed on the lease directory (or on
//! the directory containing a single lease file). Its callback runs on the
//! watcher's own thread and forwards classified events into a tokio
//! channel; the stream owns the watcher so dropping it stops watching.

use crate::parser::LeaseParser;
use crate::source::file_scope;
use leasedns_core::lease::Scope;
use leasedns_core::traits::ScopeEvent;
use leasedns_core::{Error, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// Maps paths under the watched directory to scopes
pub(crate) struct ScopeFilter {
    /// Directory handed to the watcher
    dir: PathBuf,
    /// File name of a single-file source
    file: Option<OsString>,
    parser: Arc<dyn LeaseParser>,
}

impl ScopeFilter {
    pub(crate) fn new(root: &Path, parser: Arc<dyn LeaseParser>) -> Self {
        if root.is_dir() {
            return Self {
                dir: root.to_path_buf(),
                file: None,
                parser,
            };
        }

        let dir = match root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            dir,
            file: root.file_name().map(OsString::from),
            parser,
        }
    }

    /// The scope a path belongs to, if any
    fn scope_for(&self, path: &Path) -> Option<Scope> {
        let name = path.file_name()?;
        match &self.file {
            Some(file) => (name == file.as_os_str()).then(|| file_scope(path)),
            None => {
                let hidden = name.to_string_lossy().starts_with('.');
                (!hidden && self.parser.accepts(path)).then(|| file_scope(path))
            }
        }
    }

    /// Translate one raw notification into scope events
    fn classify(&self, event: &Event) -> Vec<ScopeEvent> {
        event
            .paths
            .iter()
            .filter_map(|path| {
                let scope = self.scope_for(path)?;
                let exists = path.exists();
                match event.kind {
                    EventKind::Create(_) if exists => Some(ScopeEvent::Created(scope)),
                    // Renames in and out of the directory show up as name changes
                    EventKind::Modify(ModifyKind::Name(_)) => Some(if exists {
                        ScopeEvent::Created(scope)
                    } else {
                        ScopeEvent::Deleted(scope)
                    }),
                    EventKind::Modify(_) => Some(if exists {
                        ScopeEvent::Modified(scope)
                    } else {
                        ScopeEvent::Deleted(scope)
                    }),
                    EventKind::Remove(_) => Some(ScopeEvent::Deleted(scope)),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Stream of scope events backed by a live filesystem watcher
pub(crate) struct ScopeWatchStream {
    rx: mpsc::UnboundedReceiver<ScopeEvent>,
    _watcher: RecommendedWatcher,
}

impl ScopeWatchStream {
    /// Start watching the filter's directory
    pub(crate) fn spawn(filter: ScopeFilter) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let dir = filter.dir.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for scope_event in filter.classify(&event) {
                    debug!("Filesystem event {:?} -> {:?}", event.kind, scope_event);
                    if tx.send(scope_event).is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!("Watch error: {}", e),
        })
        .map_err(|e| Error::watch(format!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::watch(format!("Failed to watch {}: {}", dir.display(), e)))?;

        info!("Watching {} for lease file changes", dir.display());
        Ok(Self { rx, _watcher: watcher })
    }
}

impl Stream for ScopeWatchStream {
    type Item = ScopeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
