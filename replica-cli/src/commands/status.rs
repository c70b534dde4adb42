//! `replica status` — installed release, latest release, backups.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use replica_sync::{RemoteState, StatusReport};

use super::CommonArgs;

/// Arguments for `replica status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Do not query the release store.
    #[arg(long)]
    pub offline: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.common.settings()?;
        let report =
            replica_sync::status(&settings, self.offline).context("failed to inspect replica")?;

        if self.json {
            print_json(&report)?;
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusJson {
    repository: String,
    replica: String,
    replica_bytes: Option<u64>,
    marker: String,
    installed: Option<String>,
    latest: Option<String>,
    remote_error: Option<String>,
    current: Option<bool>,
    backups: Vec<String>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_json(report: &StatusReport) -> Result<()> {
    let (latest, remote_error) = match &report.remote {
        RemoteState::NotQueried => (None, None),
        RemoteState::Latest(tag) => (Some(tag.to_string()), None),
        RemoteState::Unavailable(reason) => (None, Some(reason.clone())),
    };
    let payload = StatusJson {
        repository: report.coordinates.to_string(),
        replica: report.replica.display().to_string(),
        replica_bytes: report.replica_bytes,
        marker: report.marker.display().to_string(),
        installed: report.local_tag.as_ref().map(ToString::to_string),
        latest,
        remote_error,
        current: report.is_current(),
        backups: report
            .backups
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: &StatusReport) {
    let installed = report
        .local_tag
        .as_ref()
        .map_or_else(|| "none".to_string(), ToString::to_string);
    let latest = match &report.remote {
        RemoteState::NotQueried => "not queried".to_string(),
        RemoteState::Latest(tag) => tag.to_string(),
        RemoteState::Unavailable(reason) => format!("unavailable: {reason}"),
    };
    let replica = match report.replica_bytes {
        Some(bytes) => format!("{} ({bytes} bytes)", report.replica.display()),
        None => format!("{} (missing)", report.replica.display()),
    };

    let rows = vec![
        StatusRow {
            field: "repository",
            value: report.coordinates.to_string(),
        },
        StatusRow {
            field: "replica",
            value: replica,
        },
        StatusRow {
            field: "marker",
            value: report.marker.display().to_string(),
        },
        StatusRow {
            field: "installed",
            value: installed,
        },
        StatusRow {
            field: "latest",
            value: latest,
        },
        StatusRow {
            field: "backups",
            value: report.backups.len().to_string(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    match report.is_current() {
        Some(true) => println!("{}", "CURRENT".green().bold()),
        Some(false) => println!(
            "{} run 'replica sync' to install the latest release.",
            "BEHIND".yellow().bold()
        ),
        None => {}
    }
}
