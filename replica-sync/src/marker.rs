//! Version marker — which release tag the local replica was installed from.
//!
//! A single-line text file next to the replica. Absent means "no local
//! version". Writes use the `.tmp` + rename pattern so a reader never sees
//! a half-written tag.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use replica_core::ReleaseTag;

use crate::error::{io_err, SyncError};

/// Persisted value of the last-applied tag, read once at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    path: PathBuf,
    tag: Option<ReleaseTag>,
}

impl VersionMarker {
    /// Read the marker at `path`. Missing or blank files yield no tag.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let tag = match std::fs::read_to_string(path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                (!trimmed.is_empty()).then(|| ReleaseTag::from(trimmed))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(io_err(path, err)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            tag,
        })
    }

    pub fn tag(&self) -> Option<&ReleaseTag> {
        self.tag.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff `remote` is already applied and the replica is on disk.
    pub fn should_skip(&self, remote: &ReleaseTag, replica: &Path) -> bool {
        self.tag.as_ref() == Some(remote) && replica.is_file()
    }

    /// Replace the marker content with `tag` in full.
    pub fn save(path: &Path, tag: &ReleaseTag) -> Result<(), SyncError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let tmp = tmp_path(path);
        std::fs::write(&tmp, format!("{tag}\n")).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
