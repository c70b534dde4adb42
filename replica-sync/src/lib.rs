//! # replica-sync
//!
//! Keeps a local data replica in step with the latest published release.
//!
//! Call [`pipeline::run`] for one sync attempt:
//!
//! ```text
//! resolve release ─▶ marker current? ──yes──▶ Current (no downloads, no writes)
//!                         │ no
//!                         ▼
//!                  lock ─▶ fetch ─▶ verify ─▶ backup ─▶ rename ─▶ commit marker
//! ```
//!
//! Every stage before the rename leaves the live replica and marker
//! untouched; see [`replace`] for the commit protocol.

pub mod error;
pub mod fetch;
pub mod freeze;
pub mod lock;
pub mod marker;
pub mod pipeline;
pub mod release;
pub mod replace;
pub mod verify;

pub use error::SyncError;
pub use marker::VersionMarker;
pub use pipeline::{run, status, RemoteState, StatusReport, SyncOptions, SyncOutcome};
pub use release::ReleaseClient;
pub use verify::Verification;
