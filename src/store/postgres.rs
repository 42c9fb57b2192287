use super::{CertExpiry, CertStore, CertWrite, KeyPair, StoredKeys};
use crate::{config::PgsqlConfig, schema::Table, tls};
use anyhow::{Context, Result};
use sqlx::{ConnectOptions, Connection, PgConnection, postgres::PgConnectOptions};
use tracing::debug;

/// Build connect options from the `[pgsql]` section.
///
/// Starts from `PgConnectOptions::new()` so anything left unset falls back to
/// the usual `PG*` environment variables. A host starting with `/` is the
/// directory holding the Unix socket.
#[must_use]
pub fn connect_options(config: &PgsqlConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new();

    if let Some(host) = &config.host {
        options = if host.starts_with('/') {
            options.socket(host)
        } else {
            options.host(host)
        };
    }
    if let Some(port) = config.port {
        options = options.port(port);
    }
    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(dbname) = &config.dbname {
        options = options.database(dbname);
    }
    if let Some(application_name) = &config.application_name {
        options = options.application_name(application_name);
    }
    if !config.options.is_empty() {
        options = options.options(config.options.iter().map(|(name, value)| (name, value)));
    }

    config.tls.apply(options)
}

/// Double-quote an identifier for interpolation into SQL
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `CertStore` backed by a single `PostgreSQL` connection in autocommit mode
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    /// Open the connection described by the `[pgsql]` section
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established
    pub async fn connect(config: &PgsqlConfig) -> Result<Self> {
        if config.tls.mode.is_enabled() {
            tls::ensure_crypto_provider();
        }

        let options = connect_options(config);
        debug!(
            "Connecting to {}:{}/{}",
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or_default()
        );

        let conn = options
            .connect()
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { conn })
    }

    /// Close the connection cleanly
    ///
    /// # Errors
    ///
    /// Returns an error if the terminate message cannot be sent
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

impl CertStore for PgStore {
    async fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)",
        )
        .bind(schema)
        .fetch_one(&mut self.conn)
        .await?;
        Ok(exists)
    }

    async fn create_schema(&mut self, schema: &str) -> Result<()> {
        sqlx::query(&format!("CREATE SCHEMA {}", quote_ident(schema)))
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_tables WHERE schemaname = $1 AND tablename = $2)",
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&mut self.conn)
        .await?;
        Ok(exists)
    }

    async fn create_table(&mut self, schema: &str, table: &Table) -> Result<()> {
        sqlx::query(&table.create_sql(&quote_ident(schema)))
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn find_keys_by_name(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<Option<StoredKeys>> {
        let sql = format!(
            "SELECT id, public_key, private_key FROM {}.certs WHERE name = $1",
            quote_ident(schema)
        );
        let row = sqlx::query_as::<_, StoredKeys>(&sql)
            .bind(name)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(row)
    }

    async fn find_expiry_by_name(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<Option<CertExpiry>> {
        let sql = format!(
            "SELECT id, expires FROM {}.certs WHERE name = $1",
            quote_ident(schema)
        );
        let row = sqlx::query_as::<_, CertExpiry>(&sql)
            .bind(name)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(row)
    }

    async fn fetch_keys(&mut self, schema: &str, id: i32) -> Result<Option<KeyPair>> {
        let sql = format!(
            "SELECT public_key, private_key FROM {}.certs WHERE id = $1",
            quote_ident(schema)
        );
        let row = sqlx::query_as::<_, KeyPair>(&sql)
            .bind(id)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(row)
    }

    async fn insert_cert(&mut self, schema: &str, cert: &CertWrite<'_>) -> Result<()> {
        let sql = format!(
            "INSERT INTO {}.certs (name, public_key, private_key, expires, updated) VALUES ($1, $2, $3, $4, $5)",
            quote_ident(schema)
        );
        sqlx::query(&sql)
            .bind(cert.name)
            .bind(cert.public_key)
            .bind(cert.private_key)
            .bind(cert.expires)
            .bind(cert.updated)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn update_cert(&mut self, schema: &str, id: i32, cert: &CertWrite<'_>) -> Result<()> {
        let sql = format!(
            "UPDATE {}.certs SET public_key = $1, private_key = $2, expires = $3, updated = $4 WHERE id = $5",
            quote_ident(schema)
        );
        sqlx::query(&sql)
            .bind(cert.public_key)
            .bind(cert.private_key)
            .bind(cert.expires)
            .bind(cert.updated)
            .bind(id)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }
}
