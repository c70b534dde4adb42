//! Remote locator — which repository publishes the replica releases.
//!
//! Explicit owner/repo always win. Anything missing is filled from the
//! working copy's `origin` remote URL, matched against
//! `host/owner/repo[.git]` in its https, ssh, and scp-like spellings.

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::types::RemoteCoordinates;

fn remote_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:[A-Za-z][A-Za-z0-9+.-]*://)?(?:[^@/]+@)?([^/:]+)(?::\d+)?[:/]([^/]+)/([^/]+?)(?:\.git)?/?$",
        )
        .expect("remote URL pattern is valid")
    })
}

/// Extract `(owner, repo)` from a remote URL.
///
/// Returns `None` for local paths and URLs that do not end in exactly
/// `owner/repo`.
pub fn parse_remote_url(url: &str) -> Option<RemoteCoordinates> {
    let caps = remote_pattern().captures(url.trim())?;
    let owner = caps.get(2)?.as_str();
    let repo = caps.get(3)?.as_str();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(RemoteCoordinates::new(owner, repo))
}

/// URL of the `origin` remote for the working copy at `root`.
///
/// Any failure (git missing, not a checkout, no origin) is `None`.
pub fn origin_url(root: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["remote", "get-url", "origin"])
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(
            root = %root.display(),
            status = %output.status,
            "git remote get-url origin failed"
        );
        return None;
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

/// Resolve release coordinates for `root`.
///
/// The git remote is only consulted when at least one part is missing.
pub fn locate(
    owner: Option<&str>,
    repo: Option<&str>,
    root: &Path,
) -> Result<RemoteCoordinates, ConfigError> {
    let owner = owner.map(str::trim).filter(|s| !s.is_empty());
    let repo = repo.map(str::trim).filter(|s| !s.is_empty());

    if let (Some(owner), Some(repo)) = (owner, repo) {
        return Ok(RemoteCoordinates::new(owner, repo));
    }

    let Some(url) = origin_url(root) else {
        return Err(ConfigError::UnresolvedRemote {
            detail: format!("no `origin` remote readable at {}", root.display()),
        });
    };
    locate_from_url(owner, repo, &url)
}

fn locate_from_url(
    owner: Option<&str>,
    repo: Option<&str>,
    url: &str,
) -> Result<RemoteCoordinates, ConfigError> {
    let parsed = parse_remote_url(url).ok_or_else(|| ConfigError::UnresolvedRemote {
        detail: format!("unrecognised remote URL '{url}'"),
    })?;
    Ok(RemoteCoordinates {
        owner: owner.map(str::to_owned).unwrap_or(parsed.owner),
        repo: repo.map(str::to_owned).unwrap_or(parsed.repo),
    })
}
