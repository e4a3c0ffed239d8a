//! Error types for the lease reconciliation system
//!
//! The variants follow the failure taxonomy of the reconciliation loop:
//! parse failures skip one entry, path failures degrade a whole scope to an
//! empty snapshot (or abort startup), and sink failures are logged only.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lease reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the lease reconciliation system
#[derive(Error, Debug)]
pub enum Error {
    /// A single lease entry could not be parsed
    #[error("Failed to parse lease entry in {path}: {message}")]
    SourceParse {
        /// File the entry was read from
        path: PathBuf,
        /// What was wrong with the entry
        message: String,
    },

    /// The lease source path is missing or unreadable
    #[error("Lease source unavailable at {path}: {source}")]
    SourcePath {
        /// The path that could not be read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The resolver control call failed
    #[error("Record sink error: {0}")]
    SinkApply(String),

    /// Filesystem notification setup failed
    #[error("Watch error: {0}")]
    Watch(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a source parse error
    pub fn source_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a source path error
    pub fn source_path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourcePath {
            path: path.into(),
            source,
        }
    }

    /// Create a sink apply error
    pub fn sink_apply(msg: impl Into<String>) -> Self {
        Self::SinkApply(msg.into())
    }

    /// Create a watch error
    pub fn watch(msg: impl Into<String>) -> Self {
        Self::Watch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the source itself could not be reached
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourcePath { .. })
    }
}
