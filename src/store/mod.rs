pub mod postgres;

pub use postgres::PgStore;

use crate::schema::Table;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Stored key material looked up by name, used by push to diff against local files
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredKeys {
    pub id: i32,
    pub public_key: String,
    pub private_key: String,
}

/// Row id and denormalized expiry, used by pull for the freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct CertExpiry {
    pub id: i32,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

/// Values written on insert and update
#[derive(Debug, Clone, Copy)]
pub struct CertWrite<'a> {
    pub name: &'a str,
    pub public_key: &'a str,
    pub private_key: &'a str,
    pub expires: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Everything push, pull and the schema manager need from the database.
///
/// Each call is expected to commit on its own; there is no transaction
/// spanning several calls.
#[allow(async_fn_in_trait, clippy::missing_errors_doc)]
pub trait CertStore {
    async fn schema_exists(&mut self, schema: &str) -> Result<bool>;

    async fn create_schema(&mut self, schema: &str) -> Result<()>;

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool>;

    async fn create_table(&mut self, schema: &str, table: &Table) -> Result<()>;

    async fn find_keys_by_name(&mut self, schema: &str, name: &str)
    -> Result<Option<StoredKeys>>;

    async fn find_expiry_by_name(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<Option<CertExpiry>>;

    async fn fetch_keys(&mut self, schema: &str, id: i32) -> Result<Option<KeyPair>>;

    async fn insert_cert(&mut self, schema: &str, cert: &CertWrite<'_>) -> Result<()>;

    async fn update_cert(&mut self, schema: &str, id: i32, cert: &CertWrite<'_>) -> Result<()>;
}
