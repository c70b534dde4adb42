//! Working-copy discovery.
//!
//! The replica, its marker, and the hook stubs all live relative to the
//! root of the version-controlled checkout.

use std::path::{Path, PathBuf};

/// Walk up from `start` to the first directory containing `.git`.
///
/// Falls back to `start` itself when no ancestor is a checkout.
pub fn discover_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| start.to_path_buf())
}

/// Resolve the git directory for the checkout at `root`.
///
/// `.git` is either the directory itself or, for worktrees and submodules,
/// a file containing `gitdir: <path>`.
pub fn git_dir(root: &Path) -> Option<PathBuf> {
    let dot_git = root.join(".git");
    if dot_git.is_dir() {
        return Some(dot_git);
    }
    if !dot_git.is_file() {
        return None;
    }

    let contents = std::fs::read_to_string(&dot_git).ok()?;
    let pointer = contents
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim)
        .filter(|p| !p.is_empty())?;
    let target = Path::new(pointer);
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        root.join(target)
    };
    resolved.is_dir().then_some(resolved)
}

/// The shared git directory for `git_dir`.
///
/// Linked worktrees keep a `commondir` file pointing back at the main
/// repository's git directory, which owns refs, config and hooks. Any other
/// git dir is its own common dir.
pub fn common_dir(git_dir: &Path) -> PathBuf {
    let Ok(contents) = std::fs::read_to_string(git_dir.join("commondir")) else {
        return git_dir.to_path_buf();
    };
    let pointer = contents.trim();
    if pointer.is_empty() {
        return git_dir.to_path_buf();
    }
    let target = Path::new(pointer);
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        git_dir.join(target)
    };
    if resolved.is_dir() {
        resolved
    } else {
        git_dir.to_path_buf()
    }
}
