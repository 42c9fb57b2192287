use crate::{cert, store::CertStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// Local destination for the pulled key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub public_key: PathBuf,
    pub private_key: PathBuf,
}

/// Result of a pull. A missing certificate is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    NotFound { name: String },
    UpToDate,
    Written { expires: DateTime<Utc> },
}

impl PullOutcome {
    /// Whether local files were rewritten
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Download the certificate `name` into `paths`.
///
/// Unless `force` is set, an existing local public key whose not-after equals
/// the stored `expires` counts as current and nothing is written. The key
/// material itself is not compared. Files are truncated and rewritten in
/// place, public key first.
///
/// # Errors
///
/// Returns an error if a database statement fails, the local public key
/// cannot be read or parsed, or a target file cannot be written
pub async fn pull<S: CertStore>(
    store: &mut S,
    schema: &str,
    name: &str,
    paths: &KeyPaths,
    force: bool,
) -> Result<PullOutcome> {
    let Some(row) = store
        .find_expiry_by_name(schema, name)
        .await
        .with_context(|| format!("Failed to look up certificate \"{name}\""))?
    else {
        return Ok(PullOutcome::NotFound {
            name: name.to_string(),
        });
    };

    if !force && fs::try_exists(&paths.public_key).await.unwrap_or(false) {
        let local = fs::read_to_string(&paths.public_key)
            .await
            .with_context(|| format!("Failed to read \"{}\"", paths.public_key.display()))?;
        let local_expires = cert::expiry(&local).with_context(|| {
            format!(
                "Failed to read expiry of local certificate \"{}\"",
                paths.public_key.display()
            )
        })?;

        if local_expires == row.expires {
            info!("Certificate \"{name}\" is up to date");
            return Ok(PullOutcome::UpToDate);
        }
    }

    // the row may have been removed since the expiry lookup
    let Some(keys) = store
        .fetch_keys(schema, row.id)
        .await
        .with_context(|| format!("Failed to fetch certificate \"{name}\""))?
    else {
        return Ok(PullOutcome::NotFound {
            name: name.to_string(),
        });
    };

    info!(
        "Got new certificate \"{name}\" expiring at {}",
        row.expires.to_rfc3339()
    );

    fs::write(&paths.public_key, keys.public_key.as_bytes())
        .await
        .with_context(|| format!("Failed to write \"{}\"", paths.public_key.display()))?;
    info!("Wrote public key \"{}\"", paths.public_key.display());

    fs::write(&paths.private_key, keys.private_key.as_bytes())
        .await
        .with_context(|| format!("Failed to write \"{}\"", paths.private_key.display()))?;
    info!("Wrote private key \"{}\"", paths.private_key.display());

    Ok(PullOutcome::Written {
        expires: row.expires,
    })
}
