use super::{Action, EXIT_NOT_FOUND};
use crate::{
    config::{Config, Defaults, SyncConfig},
    hooks,
    pull::{self, KeyPaths, PullOutcome},
    push, schema,
    store::{CertStore, PgStore},
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::{path::Path, process::ExitCode};
use tokio::fs;
use tracing::{error, info};

async fn read_key(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read \"{}\"", path.display()))
}

fn load_config(path: &Path, defaults: &Defaults) -> Result<Config> {
    let config = Config::load(path, defaults)?;
    info!(
        "Using schema \"{}\" from {}",
        config.sync.schema,
        path.display()
    );
    Ok(config)
}

async fn run_push(config: &Path, name: &str, paths: &KeyPaths, defaults: &Defaults) -> Result<()> {
    let config = load_config(config, defaults)?;

    // read local files before touching the database
    let public_key = read_key(&paths.public_key).await?;
    let private_key = read_key(&paths.private_key).await?;

    let schema = config.sync.schema.as_str();
    let mut store = PgStore::connect(&config.pgsql).await?;

    schema::ensure_schema(&mut store, schema).await?;
    schema::ensure_tables(&mut store, schema).await?;
    push::push(&mut store, schema, name, &public_key, &private_key, Utc::now()).await?;

    store.close().await
}

async fn run_pull(
    config: &Path,
    name: &str,
    paths: &KeyPaths,
    force: bool,
    defaults: &Defaults,
) -> Result<ExitCode> {
    let config = load_config(config, defaults)?;

    let mut store = PgStore::connect(&config.pgsql).await?;
    let code = pull_and_run_hooks(&mut store, &config.sync, name, paths, force).await?;
    store.close().await?;

    Ok(code)
}

/// Pull `name` into `paths`, run the hooks when local files changed, and map
/// the outcome to the process exit code
///
/// # Errors
///
/// Returns an error if the pull itself fails; hook failures are only logged
pub async fn pull_and_run_hooks<S: CertStore>(
    store: &mut S,
    sync: &SyncConfig,
    name: &str,
    paths: &KeyPaths,
    force: bool,
) -> Result<ExitCode> {
    match pull::pull(store, &sync.schema, name, paths, force).await? {
        PullOutcome::NotFound { name } => {
            error!("Certificate \"{name}\" not found in database");
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
        PullOutcome::UpToDate => Ok(ExitCode::SUCCESS),
        PullOutcome::Written { .. } => {
            let summary = hooks::run_hooks(&sync.hooks_dir).await;
            if summary.failed > 0 {
                info!("{} of {} hooks failed", summary.failed, summary.ran);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action, defaults: &Defaults) -> Result<ExitCode> {
    match action {
        Action::Push {
            config,
            name,
            paths,
        } => {
            run_push(&config, &name, &paths, defaults).await?;
            Ok(ExitCode::SUCCESS)
        }
        Action::Pull {
            config,
            name,
            paths,
            force,
        } => run_pull(&config, &name, &paths, force, defaults).await,
    }
}
