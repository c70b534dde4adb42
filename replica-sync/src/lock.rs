//! Process-level exclusive lock scoped to one replica path.
//!
//! Overlapping lifecycle hooks (a merge immediately followed by a checkout)
//! can start two syncs at once. The lock serialises them from staging
//! through marker commit; the loser re-reads the marker once it gets the
//! lock and usually finds nothing left to do.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{io_err, SyncError};

/// Held advisory lock on `<replica>.lock`. Released on drop.
#[derive(Debug)]
pub struct ReplicaLock {
    file: File,
    path: PathBuf,
}

impl ReplicaLock {
    /// `<replica>.lock`, next to the replica.
    pub fn path_for(replica: &Path) -> PathBuf {
        let mut name = replica.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        replica.with_file_name(name)
    }

    /// Block until the lock for `replica` is held.
    pub fn acquire(replica: &Path) -> Result<Self, SyncError> {
        let (file, path) = open_lock_file(replica)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if is_contended(&err) => {
                tracing::info!(lock = %path.display(), "another sync holds the replica lock; waiting");
                file.lock_exclusive().map_err(|source| SyncError::Lock {
                    path: path.clone(),
                    source,
                })?;
            }
            Err(source) => return Err(SyncError::Lock { path, source }),
        }

        tracing::debug!(lock = %path.display(), "acquired replica lock");
        Ok(Self { file, path })
    }

    /// Take the lock only if it is free right now.
    pub fn try_acquire(replica: &Path) -> Result<Option<Self>, SyncError> {
        let (file, path) = open_lock_file(replica)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(err) if is_contended(&err) => Ok(None),
            Err(source) => Err(SyncError::Lock { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ReplicaLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %err, "failed to release replica lock");
        }
    }
}

fn open_lock_file(replica: &Path) -> Result<(File, PathBuf), SyncError> {
    let path = ReplicaLock::path_for(replica);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    Ok((file, path))
}

fn is_contended(err: &std::io::Error) -> bool {
    // ERROR_LOCK_VIOLATION on Windows has no dedicated ErrorKind.
    err.kind() == ErrorKind::WouldBlock || (cfg!(windows) && err.raw_os_error() == Some(33))
}
