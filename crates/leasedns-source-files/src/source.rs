//! File and directory backed lease source

use crate::parser::LeaseParser;
use crate::watch::{ScopeFilter, ScopeWatchStream};
use chrono::{DateTime, Utc};
use leasedns_core::lease::{KeyStrategy, Lease, Scope};
use leasedns_core::snapshot::active_snapshot;
use leasedns_core::traits::{LeaseSource, ScopeEventStream};
use leasedns_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Lease source backed by one lease file or a directory of lease files
///
/// A single file is one scope named after the file. A directory yields one
/// scope per regular, non-hidden file the parser accepts. Whether `root`
/// is a file or a directory is checked on every access.
pub struct FileLeaseSource {
    root: PathBuf,
    parser: Arc<dyn LeaseParser>,
}

impl FileLeaseSource {
    /// Create a source reading `root` with `parser`
    pub fn new(root: impl Into<PathBuf>, parser: Arc<dyn LeaseParser>) -> Self {
        Self {
            root: root.into(),
            parser,
        }
    }

    /// The file backing a scope
    fn path_for(&self, scope: &Scope) -> PathBuf {
        if self.root.is_dir() {
            self.root.join(scope.as_str())
        } else {
            self.root.clone()
        }
    }

    async fn list_directory(&self) -> Result<Vec<Scope>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::source_path(&self.root, e))?;

        let mut scopes = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::source_path(&self.root, e))?
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.starts_with('.') || !self.parser.accepts(&path) {
                continue;
            }
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => scopes.push(Scope::new(name)),
                Ok(_) => debug!("Skipping non-file {}", path.display()),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        scopes.sort();
        Ok(scopes)
    }
}

/// Scope name for a single lease file
pub(crate) fn file_scope(path: &Path) -> Scope {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Scope::new(name)
}

#[async_trait::async_trait]
impl LeaseSource for FileLeaseSource {
    async fn scopes(&self) -> Result<Vec<Scope>> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| Error::source_path(&self.root, e))?;

        if metadata.is_dir() {
            self.list_directory().await
        } else {
            Ok(vec![file_scope(&self.root)])
        }
    }

    async fn read(&self, scope: &Scope, now: DateTime<Utc>) -> Result<Vec<Lease>> {
        let path = self.path_for(scope);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::source_path(&path, e))?;

        let raw = self.parser.parse(scope, &path, &content)?;
        let parsed = raw.len();
        let snapshot = active_snapshot(raw, now, self.parser.key_strategy());
        debug!(
            "Read {} lease entries from {}, {} active",
            parsed,
            path.display(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    fn watch(&self) -> Result<ScopeEventStream> {
        let filter = ScopeFilter::new(&self.root, Arc::clone(&self.parser));
        Ok(Box::pin(ScopeWatchStream::spawn(filter)?))
    }

    fn key_strategy(&self) -> KeyStrategy {
        self.parser.key_strategy()
    }

    fn source_name(&self) -> &'static str {
        self.parser.name()
    }
}
