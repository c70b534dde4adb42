//! Lifecycle hook installer: git hook stubs that run `replica sync`.

mod error;
pub mod installer;
pub mod paths;

pub use error::HookError;
pub use installer::{
    generate_stub, install, status, uninstall, HookState, HookStatus, STUB_MARKER,
};
pub use paths::{hooks_dir, HOOK_SLOTS};
