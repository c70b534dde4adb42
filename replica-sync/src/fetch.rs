//! Artifact fetcher — stages release assets in a scratch directory.
//!
//! Staged files never touch the replica's directory. The staging directory
//! is unique per attempt and removed when [`Staging`] drops, so a failed or
//! interrupted attempt leaves nothing for the next one to trip over.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use replica_core::{ReleaseDescriptor, SyncSettings};

use crate::error::{io_err, SyncError};
use crate::release::ReleaseClient;

/// Per-attempt scratch directory.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    /// Create a staging directory under `parent`, or the platform temp
    /// directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> Result<Self, SyncError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("replica-stage-");
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
                builder.tempdir_in(parent).map_err(|e| io_err(parent, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| io_err(std::env::temp_dir(), e))?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Files downloaded for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRelease {
    pub artifact: PathBuf,
    /// `None` when the release publishes no checksum asset.
    pub checksum: Option<PathBuf>,
    pub artifact_bytes: u64,
}

/// Download the primary asset and, when published, its checksum companion.
///
/// A missing primary asset fails before any download starts.
pub fn fetch(
    client: &ReleaseClient,
    descriptor: &ReleaseDescriptor,
    settings: &SyncSettings,
    staging: &Staging,
) -> Result<StagedRelease, SyncError> {
    let primary = descriptor
        .asset(&settings.asset)
        .ok_or_else(|| SyncError::AssetNotFound {
            tag: descriptor.tag.to_string(),
            name: settings.asset.clone(),
            available: available_assets(descriptor),
        })?;
    let checksum_asset = descriptor.asset(&settings.checksum_asset);

    let artifact = staging.path().join(staging_name(&primary.name));
    let artifact_bytes = client.download(&primary.download_url, &artifact)?;
    tracing::info!(
        asset = %primary.name,
        bytes = artifact_bytes,
        "staged release artifact"
    );

    let checksum = match checksum_asset {
        Some(asset) => {
            let path = staging.path().join(staging_name(&asset.name));
            client.download(&asset.download_url, &path)?;
            tracing::debug!(asset = %asset.name, "staged checksum");
            Some(path)
        }
        None => {
            tracing::warn!(
                tag = %descriptor.tag,
                checksum_asset = %settings.checksum_asset,
                "release publishes no checksum asset; installing without verification"
            );
            None
        }
    };

    Ok(StagedRelease {
        artifact,
        checksum,
        artifact_bytes,
    })
}

/// Asset names come from the remote; keep only the final path component.
fn staging_name(asset_name: &str) -> String {
    let name = asset_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "asset".to_string()
    } else {
        name.to_string()
    }
}

fn available_assets(descriptor: &ReleaseDescriptor) -> String {
    if descriptor.assets.is_empty() {
        return "none".to_string();
    }
    descriptor
        .assets
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
