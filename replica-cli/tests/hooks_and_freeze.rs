use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use rusqlite::Connection;
use tempfile::TempDir;

fn replica_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_replica"));
    cmd.current_dir(cwd)
        .env("NO_COLOR", "1")
        .env_remove("REPLICA_ROOT")
        .env_remove("REPLICA_PATH")
        .env_remove("REPLICA_ASSET")
        .env_remove("REPLICA_CHECKSUM_ASSET");
    cmd
}

#[test]
fn hooks_install_from_nested_directory_targets_checkout_root() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join(".git")).unwrap();
    let nested = root.path().join("src").join("deep");
    fs::create_dir_all(&nested).unwrap();

    replica_cmd(&nested)
        .args(["hooks", "install"])
        .assert()
        .success()
        .stdout(contains("post-merge"))
        .stdout(contains("post-checkout"))
        .stdout(contains("post-rewrite"));

    let stub = fs::read_to_string(root.path().join(".git/hooks/post-checkout")).unwrap();
    assert!(stub.starts_with("#!/bin/sh\n"));
    assert!(stub.contains(env!("CARGO_BIN_EXE_replica")));
    assert!(stub.trim_end().ends_with(" sync"));

    replica_cmd(&nested)
        .args(["hooks", "status"])
        .assert()
        .success()
        .stdout(contains("installed"));

    replica_cmd(&nested)
        .args(["hooks", "uninstall"])
        .assert()
        .success();
    assert!(!root.path().join(".git/hooks/post-checkout").exists());
}

#[test]
fn hooks_install_outside_checkout_fails() {
    let dir = TempDir::new().unwrap();

    replica_cmd(dir.path())
        .args(["hooks", "install", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("no git hook directory"));
}

#[test]
fn freeze_writes_artifact_and_matching_checksum() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("db.sqlite3");
    let conn = Connection::open(&source).unwrap();
    conn.execute_batch("CREATE TABLE sightings (id INTEGER PRIMARY KEY); INSERT INTO sightings DEFAULT VALUES;")
        .unwrap();
    drop(conn);
    let out = root.path().join("dist");

    replica_cmd(root.path())
        .args(["freeze", "--root"])
        .arg(root.path())
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("db_release.sqlite3"));

    let checksum = fs::read_to_string(out.join("db_release.sha256.txt")).unwrap();
    let digest = checksum.split_whitespace().next().unwrap();
    assert_eq!(digest.len(), 64);
    assert!(checksum.trim_end().ends_with("db_release.sqlite3"));

    let rows: i64 = Connection::open(out.join("db_release.sqlite3"))
        .unwrap()
        .query_row("SELECT COUNT(*) FROM sightings", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}
