use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{io_err, HookError};
use crate::paths::{hook_path, hooks_dir, HOOK_SLOTS};

/// Line that identifies a stub as ours. `uninstall` never touches hooks
/// without it.
pub const STUB_MARKER: &str = "# managed by replica: refreshes the local database replica";

/// Generate the hook script that triggers a sync.
///
/// Git runs hooks from the top of the working tree, so `sync` discovers the
/// same root the installer was pointed at.
pub fn generate_stub(program: &Path) -> String {
    format!(
        r#"#!/bin/sh
{marker}
exec {program} sync
"#,
        marker = STUB_MARKER,
        program = shell_quote(&program.display().to_string()),
    )
}

/// Write a stub into every hook slot, replacing whatever is there.
pub fn install(root: &Path, program: &Path) -> Result<Vec<PathBuf>, HookError> {
    let dir = require_hooks_dir(root)?;
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }

    let stub = generate_stub(program);
    let mut written = Vec::with_capacity(HOOK_SLOTS.len());
    for slot in HOOK_SLOTS {
        let path = hook_path(&dir, slot);
        fs::write(&path, &stub).map_err(|e| io_err(&path, e))?;
        make_executable(&path)?;
        tracing::info!(hook = %path.display(), "installed hook stub");
        written.push(path);
    }
    Ok(written)
}

/// Remove our stubs. Hooks written by anything else are left alone.
pub fn uninstall(root: &Path) -> Result<Vec<PathBuf>, HookError> {
    let dir = require_hooks_dir(root)?;

    let mut removed = Vec::new();
    for slot in HOOK_SLOTS {
        let path = hook_path(&dir, slot);
        match inspect(&path)? {
            HookState::Installed => {
                fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
                removed.push(path);
            }
            HookState::Foreign => {
                tracing::warn!(hook = %path.display(), "leaving foreign hook in place");
            }
            HookState::Missing => {}
        }
    }
    Ok(removed)
}

/// State of one hook slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Installed,
    Foreign,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookStatus {
    pub slot: &'static str,
    pub path: PathBuf,
    pub state: HookState,
}

/// Report every slot without changing anything.
pub fn status(root: &Path) -> Result<Vec<HookStatus>, HookError> {
    let dir = require_hooks_dir(root)?;
    HOOK_SLOTS
        .into_iter()
        .map(|slot| {
            let path = hook_path(&dir, slot);
            let state = inspect(&path)?;
            Ok(HookStatus { slot, path, state })
        })
        .collect()
}

fn require_hooks_dir(root: &Path) -> Result<PathBuf, HookError> {
    hooks_dir(root).ok_or_else(|| HookError::Environment {
        root: root.to_path_buf(),
    })
}

fn inspect(path: &Path) -> Result<HookState, HookError> {
    if !path.exists() {
        return Ok(HookState::Missing);
    }
    // Hooks may be binaries.
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    if text.lines().any(|line| line.trim() == STUB_MARKER) {
        Ok(HookState::Installed)
    } else {
        Ok(HookState::Foreign)
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), HookError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), HookError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checkout() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        tmp
    }

    #[test]
    fn stub_invokes_sync_with_no_other_arguments() {
        let stub = generate_stub(Path::new("/usr/local/bin/replica"));
        let lines: Vec<&str> = stub.lines().collect();

        assert_eq!(lines[0], "#!/bin/sh");
        assert_eq!(lines[1], STUB_MARKER);
        assert_eq!(lines[2], "exec '/usr/local/bin/replica' sync");
    }

    #[test]
    fn stub_quotes_awkward_program_paths() {
        let stub = generate_stub(Path::new("/opt/it's here/replica"));
        assert!(stub.contains(r"exec '/opt/it'\''s here/replica' sync"));
    }

    #[test]
    fn install_creates_hooks_dir_and_all_slots() {
        let repo = checkout();
        let written = install(repo.path(), Path::new("/bin/replica")).unwrap();

        assert_eq!(written.len(), HOOK_SLOTS.len());
        for (path, slot) in written.iter().zip(HOOK_SLOTS) {
            assert_eq!(path, &repo.path().join(".git/hooks").join(slot));
            assert!(fs::read_to_string(path).unwrap().contains(STUB_MARKER));
        }
    }

    #[cfg(unix)]
    #[test]
    fn installed_stubs_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let repo = checkout();
        for path in install(repo.path(), Path::new("/bin/replica")).unwrap() {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755, "{}", path.display());
        }
    }

    #[test]
    fn reinstall_replaces_existing_hooks_unconditionally() {
        let repo = checkout();
        let hooks = repo.path().join(".git/hooks");
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("post-merge"), "#!/bin/sh\necho custom\n").unwrap();

        install(repo.path(), Path::new("/old/replica")).unwrap();
        install(repo.path(), Path::new("/new/replica")).unwrap();

        let text = fs::read_to_string(hooks.join("post-merge")).unwrap();
        assert!(!text.contains("custom"));
        assert!(!text.contains("/old/replica"));
        assert!(text.contains("/new/replica"));
    }

    #[test]
    fn install_outside_checkout_is_environment_error() {
        let tmp = TempDir::new().unwrap();
        let err = install(tmp.path(), Path::new("/bin/replica")).unwrap_err();
        assert!(matches!(err, HookError::Environment { .. }));
        assert!(!tmp.path().join(".git").exists());
    }

    #[test]
    fn uninstall_keeps_foreign_hooks() {
        let repo = checkout();
        install(repo.path(), Path::new("/bin/replica")).unwrap();
        let hooks = repo.path().join(".git/hooks");
        fs::write(hooks.join("post-rewrite"), "#!/bin/sh\necho mine\n").unwrap();

        let removed = uninstall(repo.path()).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!hooks.join("post-merge").exists());
        assert!(!hooks.join("post-checkout").exists());
        assert!(hooks.join("post-rewrite").exists());
    }

    #[test]
    fn status_classifies_each_slot() {
        let repo = checkout();
        let hooks = repo.path().join(".git/hooks");
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("post-merge"), generate_stub(Path::new("/bin/replica"))).unwrap();
        fs::write(hooks.join("post-checkout"), "#!/bin/sh\nmake\n").unwrap();

        let states: Vec<(&str, HookState)> = status(repo.path())
            .unwrap()
            .into_iter()
            .map(|s| (s.slot, s.state))
            .collect();

        assert_eq!(
            states,
            vec![
                ("post-merge", HookState::Installed),
                ("post-checkout", HookState::Foreign),
                ("post-rewrite", HookState::Missing),
            ]
        );
    }
}
