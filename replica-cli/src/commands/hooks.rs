//! `replica hooks` — manage the git hook stubs that trigger a sync.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use replica_hooks::HookState;

use super::RootArgs;

#[derive(Subcommand, Debug)]
pub enum HooksCommand {
    /// Write stubs into post-merge, post-checkout and post-rewrite (replacing existing hooks).
    Install(RootArgs),
    /// Remove stubs written by `hooks install`; other hooks are left alone.
    Uninstall(RootArgs),
    /// Show which hook slots carry a stub.
    Status(RootArgs),
}

pub fn run(command: HooksCommand) -> Result<()> {
    match command {
        HooksCommand::Install(location) => {
            let root = location.resolve()?;
            let program =
                std::env::current_exe().context("could not locate the replica executable")?;
            let written = replica_hooks::install(&root, &program)
                .context("failed to install git hooks")?;
            for path in written {
                println!("{} {}", "installed".green(), path.display());
            }
        }
        HooksCommand::Uninstall(location) => {
            let root = location.resolve()?;
            let removed =
                replica_hooks::uninstall(&root).context("failed to remove git hooks")?;
            if removed.is_empty() {
                println!("No replica hooks installed.");
            }
            for path in removed {
                println!("{} {}", "removed".yellow(), path.display());
            }
        }
        HooksCommand::Status(location) => {
            let root = location.resolve()?;
            let slots = replica_hooks::status(&root).context("failed to inspect git hooks")?;
            for slot in slots {
                let state = match slot.state {
                    HookState::Installed => "installed".green(),
                    HookState::Foreign => "foreign".magenta(),
                    HookState::Missing => "missing".bright_black(),
                };
                println!("{:<14} {state}", slot.slot);
            }
        }
    }
    Ok(())
}
