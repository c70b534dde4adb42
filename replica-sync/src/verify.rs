//! Integrity verifier — SHA-256 of the staged artifact against the
//! published checksum.
//!
//! Checksum files are parsed tolerantly: a bare digest, `sha256sum` output
//! (`<hash>  <file>` or `<hash> *<file>`), or any text that contains a
//! 64-hex token somewhere. Only the first token counts.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};
use crate::fetch::StagedRelease;

/// Result of a successful verification step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The artifact digest matched the published checksum.
    Verified { digest: String },
    /// No checksum was published; the transfer is trusted as-is.
    Unverified,
}

fn digest_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9A-Fa-f]{64}").expect("digest pattern is valid"))
}

/// Extract the expected digest from checksum text, lowercased.
pub fn parse_expected_digest(text: &str) -> Option<String> {
    let cleaned = text.trim();
    if cleaned.len() == 64 && cleaned.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Some(cleaned.to_string());
    }
    digest_pattern()
        .find(text)
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Lowercase hex SHA-256 of the file at `path`, streamed.
pub fn sha256_file(path: &Path) -> Result<String, SyncError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(path, e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Gate a staged release before it may be installed.
///
/// On mismatch (or an unparseable checksum) the staged artifact is deleted
/// and [`SyncError::Integrity`] returned.
pub fn verify(staged: &StagedRelease) -> Result<Verification, SyncError> {
    let Some(checksum_path) = staged.checksum.as_deref() else {
        return Ok(Verification::Unverified);
    };

    let bytes = std::fs::read(checksum_path).map_err(|e| io_err(checksum_path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let actual = sha256_file(&staged.artifact)?;

    let Some(expected) = parse_expected_digest(&text) else {
        discard(&staged.artifact);
        return Err(SyncError::Integrity {
            path: staged.artifact.clone(),
            expected: "<no SHA-256 digest in checksum asset>".to_string(),
            actual,
        });
    };

    if !expected.eq_ignore_ascii_case(&actual) {
        discard(&staged.artifact);
        return Err(SyncError::Integrity {
            path: staged.artifact.clone(),
            expected,
            actual,
        });
    }

    tracing::debug!(digest = %actual, "artifact digest verified");
    Ok(Verification::Verified { digest: actual })
}

fn discard(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "could not discard staged artifact");
    }
}
