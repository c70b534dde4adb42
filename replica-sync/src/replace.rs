//! Replacer — the only code that mutates the live replica or its marker.
//!
//! ## Commit protocol
//!
//! 1. Copy the current replica (if any) to `<replica>.bak.<YYYYMMDD-HHMMSS>`.
//!    Create-new: an existing backup with that name is never overwritten.
//! 2. Rename the verified staged artifact onto the replica path. When the
//!    staging area is on another filesystem the artifact is first copied to
//!    `<replica>.replica.tmp` beside the replica and that file is renamed.
//! 3. Rewrite the version marker (`.tmp` + rename).
//!
//! A failure in step 1 or 2 leaves replica and marker untouched (a fresh
//! backup is removed again). A failure in step 3 rolls the replica back
//! from the backup, so callers observe either the old pair or the new pair.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use replica_core::ReleaseTag;

use crate::error::{io_err, SyncError};
use crate::marker::VersionMarker;

pub const BACKUP_INFIX: &str = ".bak.";
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `<dir>/<replica-name>.bak.<YYYYMMDD-HHMMSS>`
pub fn backup_path(replica: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = replica.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_INFIX);
    name.push(at.format(BACKUP_TIMESTAMP_FORMAT).to_string());
    replica.with_file_name(name)
}

/// Existing backups of `replica`, oldest first (timestamps sort lexically).
pub fn list_backups(replica: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let Some(dir) = replica.parent() else {
        return Ok(Vec::new());
    };
    let Some(name) = replica.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{name}{BACKUP_INFIX}");

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(dir, err)),
    };
    let mut backups: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect();
    backups.sort();
    Ok(backups)
}

/// Journal and WAL files SQLite keeps beside `replica`, if any exist.
///
/// A hot journal left behind would be replayed onto the freshly installed
/// file the next time it is opened.
pub fn sqlite_sidecars(replica: &Path) -> Vec<PathBuf> {
    const SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];
    SUFFIXES
        .into_iter()
        .map(|suffix| {
            let mut name = replica.file_name().unwrap_or_default().to_os_string();
            name.push(suffix);
            replica.with_file_name(name)
        })
        .filter(|path| path.exists())
        .collect()
}

/// Result of a committed replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced {
    /// Backup of the previous replica; `None` on first install.
    pub backup: Option<PathBuf>,
}

/// Installs a verified artifact as the live replica.
#[derive(Debug, Clone)]
pub struct Replacer {
    replica: PathBuf,
    marker: PathBuf,
}

impl Replacer {
    pub fn new(replica: impl Into<PathBuf>, marker: impl Into<PathBuf>) -> Self {
        Self {
            replica: replica.into(),
            marker: marker.into(),
        }
    }

    /// Run the three-step commit for `artifact` at release `tag`.
    pub fn commit(
        &self,
        artifact: &Path,
        tag: &ReleaseTag,
        now: DateTime<Local>,
    ) -> Result<Replaced, SyncError> {
        if let Some(dir) = self.replica.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }

        // Step 1: backup.
        let backup = if self.replica.is_file() {
            let path = backup_path(&self.replica, now);
            copy_new(&self.replica, &path)?;
            tracing::info!(backup = %path.display(), "backed up previous replica");
            Some(path)
        } else {
            None
        };

        // Step 2: move into place.
        for sidecar in sqlite_sidecars(&self.replica) {
            tracing::warn!(
                sidecar = %sidecar.display(),
                "SQLite sidecar of the previous replica is still present; \
                 close connections and remove it before opening the new replica"
            );
        }
        if let Err(err) = install_file(artifact, &self.replica) {
            if let Some(path) = &backup {
                remove_quietly(path);
            }
            return Err(err);
        }

        // Step 3: commit the marker.
        if let Err(err) = VersionMarker::save(&self.marker, tag) {
            tracing::error!(
                marker = %self.marker.display(),
                error = %err,
                "marker commit failed; rolling back replica"
            );
            self.rollback(backup.as_deref());
            return Err(err);
        }

        tracing::info!(tag = %tag, replica = %self.replica.display(), "installed replica");
        Ok(Replaced { backup })
    }

    fn rollback(&self, backup: Option<&Path>) {
        let restored = match backup {
            Some(backup) => {
                let tmp = sibling_tmp(&self.replica);
                let result = std::fs::copy(backup, &tmp)
                    .and_then(|_| std::fs::rename(&tmp, &self.replica));
                if result.is_err() {
                    remove_quietly(&tmp);
                }
                result
            }
            None => std::fs::remove_file(&self.replica),
        };

        match restored {
            Ok(()) => {
                if let Some(backup) = backup {
                    remove_quietly(backup);
                }
            }
            Err(err) => tracing::error!(
                replica = %self.replica.display(),
                error = %err,
                "rollback failed; previous replica remains in its backup"
            ),
        }
    }
}

/// Copy `src` to a path that must not exist yet.
fn copy_new(src: &Path, dest: &Path) -> Result<(), SyncError> {
    let mut reader = File::open(src).map_err(|e| io_err(src, e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| io_err(dest, e))?;
    if let Err(err) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        remove_quietly(dest);
        return Err(io_err(dest, err));
    }
    Ok(())
}

/// Move `src` onto `dest`, falling back to copy-beside-then-rename when a
/// direct rename is impossible (e.g. across filesystems).
fn install_file(src: &Path, dest: &Path) -> Result<(), SyncError> {
    let rename_err = match std::fs::rename(src, dest) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    tracing::debug!(
        src = %src.display(),
        dest = %dest.display(),
        error = %rename_err,
        "direct rename failed; staging beside replica"
    );

    let tmp = sibling_tmp(dest);
    let staged = std::fs::copy(src, &tmp)
        .and_then(|_| File::open(&tmp))
        .and_then(|f| f.sync_all());
    if let Err(err) = staged {
        remove_quietly(&tmp);
        return Err(io_err(src, err));
    }
    if let Err(err) = std::fs::rename(&tmp, dest) {
        remove_quietly(&tmp);
        return Err(io_err(dest, err));
    }
    remove_quietly(src);
    Ok(())
}

fn sibling_tmp(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".replica.tmp");
    path.with_file_name(name)
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "cleanup failed"),
    }
}
