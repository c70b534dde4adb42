//! Sync configuration.
//!
//! # Resolution order
//!
//! ```text
//! Overrides (CLI flags / REPLICA_* env)  >  <root>/replica.yaml  >  defaults
//! ```
//!
//! Resolution happens exactly once per run, before any network call, and
//! produces an immutable [`SyncSettings`]. Components never read ambient
//! environment state on their own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::remote;
use crate::types::{Credential, RemoteCoordinates};

pub const CONFIG_FILE_NAME: &str = "replica.yaml";
pub const DEFAULT_ASSET: &str = "db_release.sqlite3";
pub const DEFAULT_CHECKSUM_ASSET: &str = "db_release.sha256.txt";
pub const DEFAULT_REPLICA: &str = "db.sqlite3";
pub const DEFAULT_MARKER: &str = ".db_release_tag";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Environment variables consulted (in order) for the bearer credential.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

/// On-disk `replica.yaml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub asset: Option<String>,
    pub checksum_asset: Option<String>,
    pub replica: Option<PathBuf>,
    pub marker: Option<PathBuf>,
    pub api_base: Option<String>,
}

impl ConfigFile {
    /// `<root>/replica.yaml` — pure, no I/O.
    pub fn path_at(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Load the config file under `root`; absent file → defaults.
    pub fn load_at(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_at(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Values supplied by the caller (CLI flags, which themselves fall back to
/// `REPLICA_*` environment variables).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub asset: Option<String>,
    pub checksum_asset: Option<String>,
    pub replica: Option<PathBuf>,
    pub marker: Option<PathBuf>,
    pub api_base: Option<String>,
    /// Parent directory for per-attempt staging; platform temp dir if unset.
    pub scratch_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Fully resolved, immutable settings for one sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub root: PathBuf,
    pub coordinates: RemoteCoordinates,
    pub asset: String,
    pub checksum_asset: String,
    pub replica: PathBuf,
    pub marker: PathBuf,
    pub api_base: String,
    pub credential: Option<Credential>,
    pub scratch_dir: Option<PathBuf>,
}

impl SyncSettings {
    /// Resolve settings for the checkout at `root`, reading the credential
    /// from the process environment.
    pub fn resolve(root: &Path, overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(root, overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`SyncSettings::resolve`] with an injectable environment lookup.
    pub fn resolve_with_env(
        root: &Path,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = ConfigFile::load_at(root)?;
        let local = LocalPaths::resolve(root, &overrides, &file)?;

        let owner = overrides.owner.or(file.owner);
        let repo = overrides.repo.or(file.repo);
        let coordinates = remote::locate(owner.as_deref(), repo.as_deref(), root)?;

        let api_base = overrides
            .api_base
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        if api_base.is_empty() {
            return Err(ConfigError::Invalid {
                key: "api_base",
                reason: "must not be empty".to_string(),
            });
        }

        let credential = TOKEN_ENV_VARS
            .iter()
            .find_map(|key| env(key).and_then(Credential::new));

        Ok(Self {
            root: root.to_path_buf(),
            coordinates,
            asset: local.asset,
            checksum_asset: local.checksum_asset,
            replica: local.replica,
            marker: local.marker,
            api_base,
            credential,
            scratch_dir: overrides.scratch_dir,
        })
    }
}

/// The subset of settings that never needs the remote: asset names and
/// on-disk locations. Used by commands that work offline (`freeze`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPaths {
    pub asset: String,
    pub checksum_asset: String,
    pub replica: PathBuf,
    pub marker: PathBuf,
}

impl LocalPaths {
    /// Load `replica.yaml` under `root` and resolve local paths only.
    pub fn load(root: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = ConfigFile::load_at(root)?;
        Self::resolve(root, overrides, &file)
    }

    fn resolve(root: &Path, overrides: &Overrides, file: &ConfigFile) -> Result<Self, ConfigError> {
        let asset = non_empty(
            "asset",
            overrides.asset.clone().or_else(|| file.asset.clone()),
            DEFAULT_ASSET,
        )?;
        let checksum_asset = non_empty(
            "checksum_asset",
            overrides
                .checksum_asset
                .clone()
                .or_else(|| file.checksum_asset.clone()),
            DEFAULT_CHECKSUM_ASSET,
        )?;
        if asset == checksum_asset {
            return Err(ConfigError::Invalid {
                key: "checksum_asset",
                reason: format!("must differ from the primary asset name '{asset}'"),
            });
        }

        let replica = overrides
            .replica
            .clone()
            .or_else(|| file.replica.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPLICA));
        let replica = absolutize(root, replica);
        if replica.file_name().is_none() {
            return Err(ConfigError::Invalid {
                key: "replica",
                reason: format!("'{}' does not name a file", replica.display()),
            });
        }

        // The marker sits alongside the replica unless placed explicitly.
        let marker = match overrides.marker.clone().or_else(|| file.marker.clone()) {
            Some(marker) => absolutize(root, marker),
            None => replica
                .parent()
                .unwrap_or(root)
                .join(DEFAULT_MARKER),
        };

        Ok(Self {
            asset,
            checksum_asset,
            replica,
            marker,
        })
    }
}

fn non_empty(
    key: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    match value {
        None => Ok(default.to_string()),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Invalid {
            key,
            reason: "must not be empty".to_string(),
        }),
        Some(v) => Ok(v.trim().to_string()),
    }
}

fn absolutize(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
