use std::path::{Path, PathBuf};
use std::process::Command;

use replica_core::workspace;

/// Events after which the replica may be out of date.
pub const HOOK_SLOTS: [&str; 3] = ["post-merge", "post-checkout", "post-rewrite"];

/// The directory git reads hooks from for the checkout at `root`.
///
/// Asks git first, which honours `core.hooksPath` and linked worktrees.
/// Without a usable git binary, falls back to `<common-dir>/hooks`.
pub fn hooks_dir(root: &Path) -> Option<PathBuf> {
    if let Some(dir) = git_hooks_path(root) {
        return Some(dir);
    }
    workspace::git_dir(root).map(|dir| workspace::common_dir(&dir).join("hooks"))
}

pub fn hook_path(hooks_dir: &Path, slot: &str) -> PathBuf {
    hooks_dir.join(slot)
}

/// `git rev-parse --git-path hooks`, made absolute against `root`.
///
/// Only trusted when git agrees that `root` is the top of the working tree,
/// so a broken checkout nested inside another repository is not mistaken
/// for its parent.
fn git_hooks_path(root: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["rev-parse", "--show-toplevel", "--git-path", "hooks"])
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(root = %root.display(), status = %output.status, "git rev-parse failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let toplevel = Path::new(lines.next()?);
    let hooks = Path::new(lines.next()?);

    let same_root = match (toplevel.canonicalize(), root.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same_root {
        tracing::debug!(
            root = %root.display(),
            toplevel = %toplevel.display(),
            "git resolved a different working tree"
        );
        return None;
    }

    Some(if hooks.is_absolute() {
        hooks.to_path_buf()
    } else {
        root.join(hooks)
    })
}
