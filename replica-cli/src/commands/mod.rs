//! Subcommand implementations and the flags they share.

pub mod freeze;
pub mod hooks;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use replica_core::{workspace, Overrides, SyncSettings};

/// Where the checkout lives.
#[derive(Args, Debug, Clone, Default)]
pub struct RootArgs {
    /// Checkout root (defaults to the nearest ancestor containing `.git`).
    #[arg(long, env = "REPLICA_ROOT")]
    pub root: Option<PathBuf>,
}

impl RootArgs {
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        Ok(workspace::discover_root(&cwd))
    }
}

/// Flags accepted by every command that talks about the replica.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[command(flatten)]
    pub location: RootArgs,

    /// Owner of the repository publishing releases.
    #[arg(long, env = "REPLICA_OWNER")]
    pub owner: Option<String>,

    /// Name of the repository publishing releases.
    #[arg(long, env = "REPLICA_REPO")]
    pub repo: Option<String>,

    /// Release asset holding the database.
    #[arg(long, env = "REPLICA_ASSET")]
    pub asset: Option<String>,

    /// Release asset holding the SHA-256 digest.
    #[arg(long, env = "REPLICA_CHECKSUM_ASSET")]
    pub checksum_asset: Option<String>,

    /// Local replica path, relative to the root unless absolute.
    #[arg(long, env = "REPLICA_PATH")]
    pub replica: Option<PathBuf>,

    /// Release API base URL.
    #[arg(long, env = "REPLICA_API_BASE")]
    pub api_base: Option<String>,
}

impl CommonArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            asset: self.asset.clone(),
            checksum_asset: self.checksum_asset.clone(),
            replica: self.replica.clone(),
            api_base: self.api_base.clone(),
            ..Overrides::default()
        }
    }

    pub fn root(&self) -> Result<PathBuf> {
        self.location.resolve()
    }

    pub fn settings(&self) -> Result<SyncSettings> {
        let root = self.root()?;
        let settings = SyncSettings::resolve(&root, self.overrides())
            .with_context(|| format!("failed to resolve settings for {}", root.display()))?;
        tracing::debug!(
            root = %settings.root.display(),
            repository = %settings.coordinates,
            replica = %settings.replica.display(),
            "resolved settings"
        );
        Ok(settings)
    }
}
