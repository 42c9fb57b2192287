use crate::{
    cert,
    store::{CertStore, CertWrite},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::info;

/// What a push did to the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Added,
    Updated,
    UpToDate,
}

impl fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Updated => write!(f, "updated"),
            Self::UpToDate => write!(f, "up to date"),
        }
    }
}

/// Upload a certificate and its private key under `name`.
///
/// Key text is compared byte for byte with the stored row; any difference in
/// either key rewrites all mutable columns, keeping the row id. `now` becomes
/// the `updated` timestamp.
///
/// # Errors
///
/// Returns an error if the public key is not a parsable PEM certificate or a
/// database statement fails
pub async fn push<S: CertStore>(
    store: &mut S,
    schema: &str,
    name: &str,
    public_key: &str,
    private_key: &str,
    now: DateTime<Utc>,
) -> Result<PushOutcome> {
    let existing = store
        .find_keys_by_name(schema, name)
        .await
        .with_context(|| format!("Failed to look up certificate \"{name}\""))?;

    let expires = cert::expiry(public_key)
        .with_context(|| format!("Failed to read expiry of certificate \"{name}\""))?;

    let write = CertWrite {
        name,
        public_key,
        private_key,
        expires,
        updated: now,
    };

    let outcome = match existing {
        None => {
            store
                .insert_cert(schema, &write)
                .await
                .with_context(|| format!("Failed to add certificate \"{name}\""))?;
            PushOutcome::Added
        }
        Some(row) if row.public_key != public_key || row.private_key != private_key => {
            store
                .update_cert(schema, row.id, &write)
                .await
                .with_context(|| format!("Failed to update certificate \"{name}\""))?;
            PushOutcome::Updated
        }
        Some(_) => PushOutcome::UpToDate,
    };

    info!("Certificate \"{name}\" {outcome}");

    Ok(outcome)
}
