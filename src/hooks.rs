//! Post-pull hooks: every entry of the hooks directory is executed, failures
//! are logged and never propagated.

use std::path::{Path, PathBuf};
use tokio::{fs, process::Command};
use tracing::{info, warn};

/// How many hooks ran and how many of those failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSummary {
    pub ran: usize,
    pub failed: usize,
}

/// Run every entry of `dir` in file-name order, without arguments, with
/// inherited stdio.
///
/// A missing `dir` is skipped. A `dir` that exists but cannot be listed (for
/// example a regular file) is logged as a warning and no hook runs; it is not
/// an error for the caller.
pub async fn run_hooks(dir: &Path) -> HookSummary {
    let mut summary = HookSummary::default();

    if !fs::try_exists(dir).await.unwrap_or(false) {
        info!("\"{}\" does not exist, skipping hooks", dir.display());
        return summary;
    }

    let hooks = match list_hooks(dir).await {
        Ok(hooks) => hooks,
        Err(err) => {
            warn!("Failed to list hooks in \"{}\": {err}", dir.display());
            return summary;
        }
    };

    for hook in hooks {
        info!("Running \"{}\"", hook.display());
        summary.ran += 1;

        match Command::new(&hook).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                summary.failed += 1;
                warn!("Hook \"{}\" failed to run: {status}", hook.display());
            }
            Err(err) => {
                summary.failed += 1;
                warn!("Hook \"{}\" failed to run: {err}", hook.display());
            }
        }
    }

    summary
}

async fn list_hooks(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut hooks = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        hooks.push(entry.path());
    }
    hooks.sort();
    Ok(hooks)
}
