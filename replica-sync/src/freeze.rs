//! Publisher side: snapshot a live SQLite database into a release asset.
//!
//! Uses SQLite's online backup API, so the snapshot is consistent even if
//! another connection is writing. The checksum companion is written in
//! `sha256sum` format, which is exactly what [`crate::verify`] parses.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, DatabaseName, OpenFlags};

use crate::error::{io_err, SyncError};
use crate::verify::sha256_file;

/// Files produced by [`freeze`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frozen {
    pub artifact: PathBuf,
    pub checksum: PathBuf,
    pub digest: String,
    pub bytes: u64,
}

/// Snapshot `source` into `<out_dir>/<asset_name>` and write
/// `<out_dir>/<checksum_name>`. Existing outputs are replaced.
pub fn freeze(
    source: &Path,
    out_dir: &Path,
    asset_name: &str,
    checksum_name: &str,
) -> Result<Frozen, SyncError> {
    if !source.is_file() {
        return Err(io_err(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source database not found"),
        ));
    }
    std::fs::create_dir_all(out_dir).map_err(|e| io_err(out_dir, e))?;

    let artifact = out_dir.join(asset_name);
    let checksum = out_dir.join(checksum_name);
    let tmp = out_dir.join(format!("{asset_name}.tmp"));
    if tmp.exists() {
        std::fs::remove_file(&tmp).map_err(|e| io_err(&tmp, e))?;
    }

    let freeze_err = |source_err: rusqlite::Error| SyncError::Freeze {
        path: source.to_path_buf(),
        source: source_err,
    };
    let conn = Connection::open_with_flags(
        source,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(freeze_err)?;
    if let Err(err) = conn.backup(DatabaseName::Main, &tmp, None) {
        let _ = std::fs::remove_file(&tmp);
        return Err(freeze_err(err));
    }
    drop(conn);

    std::fs::rename(&tmp, &artifact).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_err(&artifact, e)
    })?;

    let digest = sha256_file(&artifact)?;
    let bytes = std::fs::metadata(&artifact)
        .map_err(|e| io_err(&artifact, e))?
        .len();

    let checksum_tmp = out_dir.join(format!("{checksum_name}.tmp"));
    std::fs::write(&checksum_tmp, format!("{digest}  {asset_name}\n"))
        .map_err(|e| io_err(&checksum_tmp, e))?;
    std::fs::rename(&checksum_tmp, &checksum).map_err(|e| io_err(&checksum, e))?;

    tracing::info!(
        artifact = %artifact.display(),
        digest = %digest,
        bytes,
        "froze release snapshot"
    );
    Ok(Frozen {
        artifact,
        checksum,
        digest,
        bytes,
    })
}
