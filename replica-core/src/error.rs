//! Error types for replica-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither explicit owner/repo nor a parseable `origin` remote was available.
    #[error(
        "cannot resolve release repository: pass --owner/--repo, set them in replica.yaml, \
         or configure an `origin` remote ({detail})"
    )]
    UnresolvedRemote { detail: String },

    /// A configured value is present but unusable (e.g. empty asset name).
    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
