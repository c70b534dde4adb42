//! Shared sync pipeline entrypoint used by the CLI and the hook stubs.

use std::path::PathBuf;

use chrono::Local;

use replica_core::{ReleaseTag, RemoteCoordinates, SyncSettings};

use crate::fetch::{fetch, Staging};
use crate::lock::ReplicaLock;
use crate::marker::VersionMarker;
use crate::release::ReleaseClient;
use crate::replace::{list_backups, Replacer};
use crate::verify::{verify, Verification};
use crate::SyncError;

/// Knobs for a single sync attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Resolve the release and report what would happen; download nothing.
    pub dry_run: bool,
}

/// Outcome of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local marker already matches the latest release and the replica exists.
    Current { tag: ReleaseTag },
    /// `dry_run`: a newer release would be installed.
    WouldInstall {
        tag: ReleaseTag,
        previous: Option<ReleaseTag>,
    },
    /// A new replica was installed and the marker committed.
    Installed {
        tag: ReleaseTag,
        previous: Option<ReleaseTag>,
        backup: Option<PathBuf>,
        verification: Verification,
    },
}

/// Run one sync attempt against the configured release store.
pub fn run(settings: &SyncSettings, options: SyncOptions) -> Result<SyncOutcome, SyncError> {
    run_with(&ReleaseClient::from_settings(settings), settings, options)
}

/// [`run`] with an explicit client.
pub fn run_with(
    client: &ReleaseClient,
    settings: &SyncSettings,
    options: SyncOptions,
) -> Result<SyncOutcome, SyncError> {
    let descriptor = client.latest(&settings.coordinates)?;
    let remote_tag = descriptor.tag.clone();

    // Skip check happens before anything is written, lock file included.
    let marker = VersionMarker::load(&settings.marker)?;
    if marker.should_skip(&remote_tag, &settings.replica) {
        tracing::info!(tag = %remote_tag, "replica is current");
        return Ok(SyncOutcome::Current { tag: remote_tag });
    }

    if options.dry_run {
        return Ok(SyncOutcome::WouldInstall {
            tag: remote_tag,
            previous: marker.tag().cloned(),
        });
    }

    let _lock = ReplicaLock::acquire(&settings.replica)?;

    // A concurrent trigger may have installed this tag while we waited.
    let marker = VersionMarker::load(&settings.marker)?;
    if marker.should_skip(&remote_tag, &settings.replica) {
        tracing::info!(tag = %remote_tag, "replica installed by a concurrent sync");
        return Ok(SyncOutcome::Current { tag: remote_tag });
    }
    let previous = marker.tag().cloned();

    tracing::info!(
        from = previous.as_ref().map(ReleaseTag::as_str).unwrap_or("<none>"),
        to = %remote_tag,
        "updating replica"
    );

    let staging = Staging::create(settings.scratch_dir.as_deref())?;
    let staged = fetch(client, &descriptor, settings, &staging)?;
    let verification = verify(&staged)?;

    let replaced = Replacer::new(&settings.replica, &settings.marker).commit(
        &staged.artifact,
        &remote_tag,
        Local::now(),
    )?;

    Ok(SyncOutcome::Installed {
        tag: remote_tag,
        previous,
        backup: replaced.backup,
        verification,
    })
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Snapshot of local replica state, optionally compared with the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub coordinates: RemoteCoordinates,
    pub replica: PathBuf,
    pub replica_bytes: Option<u64>,
    pub marker: PathBuf,
    pub local_tag: Option<ReleaseTag>,
    pub remote: RemoteState,
    pub backups: Vec<PathBuf>,
}

/// What the release store said, if it was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    NotQueried,
    Latest(ReleaseTag),
    Unavailable(String),
}

impl StatusReport {
    /// `Some(true)` when the latest remote tag is installed; `None` if the
    /// remote was not reachable or not asked.
    pub fn is_current(&self) -> Option<bool> {
        match &self.remote {
            RemoteState::Latest(tag) => {
                Some(self.local_tag.as_ref() == Some(tag) && self.replica_bytes.is_some())
            }
            _ => None,
        }
    }
}

/// Inspect local state; query the release store unless `offline`.
///
/// Remote failures are reported in the result rather than returned, so
/// status works without network access. Never writes anything.
pub fn status(settings: &SyncSettings, offline: bool) -> Result<StatusReport, SyncError> {
    let client = (!offline).then(|| ReleaseClient::from_settings(settings));
    status_with(client.as_ref(), settings)
}

/// [`status`] with an explicit client; `None` means offline.
pub fn status_with(
    client: Option<&ReleaseClient>,
    settings: &SyncSettings,
) -> Result<StatusReport, SyncError> {
    let marker = VersionMarker::load(&settings.marker)?;
    let replica_bytes = std::fs::metadata(&settings.replica)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len());
    let backups = list_backups(&settings.replica)?;

    let remote = match client {
        None => RemoteState::NotQueried,
        Some(client) => match client.latest(&settings.coordinates) {
            Ok(descriptor) => RemoteState::Latest(descriptor.tag),
            Err(err) => RemoteState::Unavailable(err.to_string()),
        },
    };

    Ok(StatusReport {
        coordinates: settings.coordinates.clone(),
        replica: settings.replica.clone(),
        replica_bytes,
        marker: settings.marker.clone(),
        local_tag: marker.tag().cloned(),
        remote,
        backups,
    })
}
