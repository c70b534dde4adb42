//! `replica freeze` — publisher side: snapshot the live database into release assets.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use replica_core::LocalPaths;

use super::CommonArgs;

/// Arguments for `replica freeze`.
#[derive(Args, Debug)]
pub struct FreezeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Database to snapshot (defaults to the configured replica path).
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Directory receiving the artifact and checksum (defaults to the root).
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

impl FreezeArgs {
    pub fn run(self) -> Result<()> {
        let root = self.common.root()?;
        let paths = LocalPaths::load(&root, &self.common.overrides())
            .with_context(|| format!("failed to resolve settings for {}", root.display()))?;
        let source = self.source.unwrap_or(paths.replica);
        let out_dir = self.out_dir.unwrap_or(root);

        let frozen = replica_sync::freeze::freeze(
            &source,
            &out_dir,
            &paths.asset,
            &paths.checksum_asset,
        )
        .with_context(|| format!("failed to freeze {}", source.display()))?;

        println!(
            "{} {} ({} bytes)",
            "froze".green().bold(),
            frozen.artifact.display(),
            frozen.bytes
        );
        println!("  checksum: {} ({})", frozen.checksum.display(), frozen.digest);
        Ok(())
    }
}
