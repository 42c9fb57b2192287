//! Schema manager: make sure the schema and the `certs` table exist before a push.

use crate::store::CertStore;
use anyhow::{Context, Result};
use tracing::info;

const SCHEMA_PLACEHOLDER: &str = "{schema}";

/// A table this tool owns, with the DDL to create it inside a given schema
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    ddl: &'static str,
}

impl Table {
    /// `CREATE TABLE` statement for this table inside an already quoted schema
    #[must_use]
    pub fn create_sql(&self, quoted_schema: &str) -> String {
        self.ddl.replace(SCHEMA_PLACEHOLDER, quoted_schema)
    }
}

pub const TABLES: &[Table] = &[Table {
    name: "certs",
    ddl: r"
        CREATE TABLE {schema}.certs (
            id SERIAL UNIQUE PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            public_key TEXT NOT NULL,
            private_key TEXT NOT NULL,
            expires TIMESTAMPTZ NOT NULL,
            updated TIMESTAMPTZ DEFAULT NOW()
        )
        ",
}];

/// Create `schema` unless it already exists. Returns `true` when it was created.
///
/// The existence check comes first so a schema managed by someone else is
/// never touched.
///
/// # Errors
///
/// Returns an error if the catalog lookup or the `CREATE SCHEMA` fails
pub async fn ensure_schema<S: CertStore>(store: &mut S, schema: &str) -> Result<bool> {
    if store
        .schema_exists(schema)
        .await
        .with_context(|| format!("Failed to look up schema \"{schema}\""))?
    {
        return Ok(false);
    }

    info!("Creating schema \"{schema}\"");
    store
        .create_schema(schema)
        .await
        .with_context(|| format!("Failed to create schema \"{schema}\""))?;

    Ok(true)
}

/// Create every table in [`TABLES`] missing from `schema`, returning the names created
///
/// # Errors
///
/// Returns an error if a catalog lookup or a `CREATE TABLE` fails
pub async fn ensure_tables<S: CertStore>(store: &mut S, schema: &str) -> Result<Vec<&'static str>> {
    let mut missing = Vec::new();
    for table in TABLES {
        if !store
            .table_exists(schema, table.name)
            .await
            .with_context(|| format!("Failed to look up table \"{schema}.{}\"", table.name))?
        {
            missing.push(table);
        }
    }

    if !missing.is_empty() {
        info!("Missing {} tables", missing.len());
    }

    let mut created = Vec::with_capacity(missing.len());
    for table in missing {
        info!("Creating \"{}\" table", table.name);
        store
            .create_table(schema, table)
            .await
            .with_context(|| format!("Failed to create table \"{schema}.{}\"", table.name))?;
        created.push(table.name);
    }

    Ok(created)
}
