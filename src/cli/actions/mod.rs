mod run;

pub use run::pull_and_run_hooks;

use crate::{config::Defaults, pull::KeyPaths};
use std::{path::PathBuf, process::ExitCode};

/// Exit status when the requested certificate is not in the database
pub const EXIT_NOT_FOUND: u8 = 1;
/// Exit status for every other failure
pub const EXIT_FAILURE: u8 = 2;

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Push {
        config: PathBuf,
        name: String,
        paths: KeyPaths,
    },
    Pull {
        config: PathBuf,
        name: String,
        paths: KeyPaths,
        force: bool,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self, defaults: &Defaults) -> anyhow::Result<ExitCode> {
        run::execute(self, defaults).await
    }
}
