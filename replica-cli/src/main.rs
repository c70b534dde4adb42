//! Replica — keep a local database replica in step with published releases.
//!
//! # Usage
//!
//! ```text
//! replica sync   [--dry-run] [--root <dir>] [--owner <o>] [--repo <r>] ...
//! replica status [--json] [--offline]
//! replica hooks  install|uninstall|status [--root <dir>]
//! replica freeze [--source <db>] [--out-dir <dir>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    freeze::FreezeArgs, hooks::HooksCommand, status::StatusArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "replica",
    version,
    about = "Sync a local database replica from the latest published release",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the latest release if the local replica is behind.
    Sync(SyncArgs),

    /// Show the installed release, the latest remote release, and backups.
    Status(StatusArgs),

    /// Manage git hooks that run `replica sync` after merge, checkout and rewrite.
    Hooks {
        #[command(subcommand)]
        command: HooksCommand,
    },

    /// Snapshot a live database into release assets (artifact + checksum).
    Freeze(FreezeArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Hooks { command } => commands::hooks::run(command),
        Commands::Freeze(args) => args.run(),
    }
}

/// Diagnostics go to stderr so stdout stays clean for `--json`.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("REPLICA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
