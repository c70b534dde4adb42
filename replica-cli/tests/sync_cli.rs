use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use mockito::{Server, ServerGuard};
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const ASSET: &str = "db_release.sqlite3";
const CHECKSUM: &str = "db_release.sha256.txt";
const ENV_VARS: [&str; 10] = [
    "REPLICA_ROOT",
    "REPLICA_OWNER",
    "REPLICA_REPO",
    "REPLICA_ASSET",
    "REPLICA_CHECKSUM_ASSET",
    "REPLICA_PATH",
    "REPLICA_API_BASE",
    "REPLICA_LOG",
    "GITHUB_TOKEN",
    "GH_TOKEN",
];

fn replica_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_replica"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(root).env("NO_COLOR", "1");
    cmd
}

fn checkout() -> TempDir {
    let root = TempDir::new().expect("root");
    fs::create_dir_all(root.path().join(".git")).expect("git dir");
    root
}

fn publish(server: &mut ServerGuard, tag: &str, payload: &[u8], checksum: Option<&str>) {
    let base = server.url();
    let mut assets = vec![format!(
        r#"{{"name":"{ASSET}","browser_download_url":"{base}/dl/{tag}/{ASSET}"}}"#
    )];
    if let Some(text) = checksum {
        assets.push(format!(
            r#"{{"name":"{CHECKSUM}","browser_download_url":"{base}/dl/{tag}/{CHECKSUM}"}}"#
        ));
        server
            .mock("GET", format!("/dl/{tag}/{CHECKSUM}").as_str())
            .with_body(text)
            .create();
    }
    server
        .mock("GET", "/repos/acme/city/releases/latest")
        .with_body(format!(
            r#"{{"tag_name":"{tag}","assets":[{}]}}"#,
            assets.join(",")
        ))
        .create();
    server
        .mock("GET", format!("/dl/{tag}/{ASSET}").as_str())
        .with_body(payload)
        .create();
}

fn sync(root: &Path, server: &ServerGuard) -> Command {
    let mut cmd = replica_cmd(root);
    cmd.args(["sync", "--owner", "acme", "--repo", "city", "--api-base"])
        .arg(server.url());
    cmd
}

#[test]
fn first_sync_installs_then_second_reports_current() {
    let mut server = Server::new();
    publish(&mut server, "v3", b"replica v3", None);
    let root = checkout();

    sync(root.path(), &server)
        .assert()
        .success()
        .stdout(contains("installed v3"))
        .stdout(contains("integrity not verified"));
    assert_eq!(fs::read(root.path().join("db.sqlite3")).unwrap(), b"replica v3");
    assert_eq!(
        fs::read_to_string(root.path().join(".db_release_tag"))
            .unwrap()
            .trim(),
        "v3"
    );

    sync(root.path(), &server)
        .assert()
        .success()
        .stdout(contains("replica is current (v3)"));
}

#[test]
fn checksum_mismatch_fails_and_keeps_previous_replica() {
    let mut server = Server::new();
    let bogus = format!("{}  {ASSET}\n", "f".repeat(64));
    publish(&mut server, "v4", b"replica v4", Some(&bogus));
    let root = checkout();
    fs::write(root.path().join("db.sqlite3"), "replica v3").unwrap();
    fs::write(root.path().join(".db_release_tag"), "v3\n").unwrap();

    sync(root.path(), &server)
        .assert()
        .failure()
        .stderr(contains("Error:"))
        .stderr(contains("integrity check failed"));

    assert_eq!(
        fs::read_to_string(root.path().join("db.sqlite3")).unwrap(),
        "replica v3"
    );
    assert_eq!(
        fs::read_to_string(root.path().join(".db_release_tag")).unwrap(),
        "v3\n"
    );
}

#[test]
fn dry_run_writes_nothing() {
    let mut server = Server::new();
    publish(&mut server, "v5", b"replica v5", None);
    let root = checkout();

    sync(root.path(), &server)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run] would install v5"));

    assert!(!root.path().join("db.sqlite3").exists());
    assert!(!root.path().join(".db_release_tag").exists());
}

#[test]
fn unresolvable_repository_is_a_configuration_error() {
    // No origin remote and no owner/repo anywhere.
    let root = checkout();

    replica_cmd(root.path())
        .args(["sync", "--api-base", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(contains("cannot resolve release repository"));

    assert!(!root.path().join("db.sqlite3").exists());
}

#[test]
fn settings_are_read_from_environment_and_token_is_sent() {
    let mut server = Server::new();
    let meta = server
        .mock("GET", "/repos/acme/city/releases/latest")
        .match_header("authorization", "Bearer sekrit")
        .with_body(r#"{"tag_name":"v1","assets":[]}"#)
        .create();
    let root = checkout();
    fs::write(root.path().join("state.db"), "x").unwrap();
    fs::write(root.path().join(".db_release_tag"), "v1\n").unwrap();

    replica_cmd(root.path())
        .arg("sync")
        .env("REPLICA_OWNER", "acme")
        .env("REPLICA_REPO", "city")
        .env("REPLICA_PATH", "state.db")
        .env("REPLICA_API_BASE", server.url())
        .env("GH_TOKEN", "sekrit")
        .assert()
        .success()
        .stdout(contains("replica is current (v1)"));
    meta.assert();
}

#[test]
fn status_json_reports_local_and_remote_state() {
    let mut server = Server::new();
    publish(&mut server, "v2", b"replica v2", None);
    let root = checkout();
    fs::write(root.path().join("db.sqlite3"), "old").unwrap();
    fs::write(root.path().join(".db_release_tag"), "v1\n").unwrap();

    let output = replica_cmd(root.path())
        .args(["status", "--json", "--owner", "acme", "--repo", "city", "--api-base"])
        .arg(server.url())
        .output()
        .expect("run status");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["repository"], "acme/city");
    assert_eq!(json["installed"], "v1");
    assert_eq!(json["latest"], "v2");
    assert_eq!(json["current"], false);
    assert_eq!(json["replica_bytes"], 3);
}

#[test]
fn status_offline_renders_table() {
    let root = checkout();
    fs::write(root.path().join(".db_release_tag"), "v7\n").unwrap();

    replica_cmd(root.path())
        .args(["status", "--offline", "--owner", "acme", "--repo", "city"])
        .assert()
        .success()
        .stdout(contains("installed").and(contains("v7")))
        .stdout(contains("not queried"))
        .stdout(contains("(missing)"));
}
