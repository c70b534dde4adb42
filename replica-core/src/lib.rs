//! replica core library — domain types, configuration resolution, errors.
//!
//! Public API surface:
//! - [`types`] — remote coordinates, release descriptors, credentials
//! - [`config`] — `replica.yaml` + overrides → [`SyncSettings`]
//! - [`remote`] — remote locator (owner/repo from the origin URL)
//! - [`workspace`] — working-copy root and git dir discovery
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod remote;
pub mod types;
pub mod workspace;

pub use config::{ConfigFile, LocalPaths, Overrides, SyncSettings};
pub use error::ConfigError;
pub use types::{Credential, ReleaseAsset, ReleaseDescriptor, ReleaseTag, RemoteCoordinates};
