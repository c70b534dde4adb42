//! `replica sync` — install the latest release when the replica is behind.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use replica_core::ReleaseTag;
use replica_sync::{SyncOptions, SyncOutcome, Verification};

use super::CommonArgs;

/// Arguments for `replica sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Resolve the latest release and report what would change, without downloading.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.common.settings()?;
        let outcome = replica_sync::run(
            &settings,
            SyncOptions {
                dry_run: self.dry_run,
            },
        )
        .with_context(|| format!("sync from {} failed", settings.coordinates))?;

        print_outcome(&outcome);
        Ok(())
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Current { tag } => {
            println!("{} replica is current ({tag})", "✓".green().bold());
        }
        SyncOutcome::WouldInstall { tag, previous } => {
            println!(
                "[dry-run] would install {tag} (installed: {})",
                describe(previous.as_ref()),
            );
        }
        SyncOutcome::Installed {
            tag,
            previous,
            backup,
            verification,
        } => {
            println!(
                "{} installed {tag} (was {})",
                "✓".green().bold(),
                describe(previous.as_ref()),
            );
            if let Some(backup) = backup {
                println!("  backup: {}", backup.display());
            }
            match verification {
                Verification::Verified { digest } => {
                    println!("  sha256 verified: {digest}");
                }
                Verification::Unverified => {
                    println!(
                        "  {} no checksum asset published; integrity not verified",
                        "!".yellow().bold()
                    );
                }
            }
        }
    }
}

fn describe(tag: Option<&ReleaseTag>) -> String {
    tag.map_or_else(|| "nothing".to_string(), ToString::to_string)
}
