use std::path::PathBuf;

use thiserror::Error;

/// Error surface for hook installation and removal.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no git hook directory for {root}: not a version-controlled checkout")]
    Environment { root: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HookError {
    HookError::Io {
        path: path.into(),
        source,
    }
}
