use crate::{cli::actions::Action, config::Defaults, pull::KeyPaths};
use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use std::path::PathBuf;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("{id} is required"))
}

fn key_paths(matches: &ArgMatches) -> Result<KeyPaths> {
    Ok(KeyPaths {
        public_key: PathBuf::from(required(matches, "public-key")?),
        private_key: PathBuf::from(required(matches, "private-key")?),
    })
}

/// Extract the `-v` count, used before any action runs to set up logging
#[must_use]
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose")
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if no known subcommand was given or required parameters are missing
pub fn dispatch(matches: &ArgMatches, defaults: &Defaults) -> Result<Action> {
    let config = matches
        .get_one::<String>("config")
        .map_or_else(|| defaults.config_path.clone(), PathBuf::from);

    match matches.subcommand() {
        Some(("push", sub)) => Ok(Action::Push {
            config,
            name: required(sub, "name")?,
            paths: key_paths(sub)?,
        }),
        Some(("pull", sub)) => Ok(Action::Pull {
            config,
            name: required(sub, "name")?,
            paths: key_paths(sub)?,
            force: sub.get_flag("force"),
        }),
        Some((other, _)) => bail!("Unknown command: {other}"),
        None => bail!("A command is required: push or pull"),
    }
}
