//! Error types for replica-sync.
//!
//! Every variant is terminal for the current invocation; nothing retries.

use std::path::PathBuf;

use thiserror::Error;

use replica_core::ConfigError;

/// All errors that can arise from a sync attempt.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Release coordinates or settings could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The release-metadata query failed (network, non-2xx, or bad body).
    #[error("release store unavailable for {target}: {reason}")]
    RemoteUnavailable { target: String, reason: String },

    /// The named asset is not attached to the latest release.
    #[error("release {tag} has no asset named '{name}' (available: {available})")]
    AssetNotFound {
        tag: String,
        name: String,
        available: String,
    },

    /// An asset transfer failed or ended early.
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// The staged artifact does not match the published checksum.
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The replica lock could not be taken.
    #[error("could not lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshotting the live database failed.
    #[error("snapshot of {path} failed: {source}")]
    Freeze {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
