#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use pg_cert_store::config::PgsqlConfig;
use pg_cert_store::schema::Table;
use pg_cert_store::store::{CertExpiry, CertStore, CertWrite, KeyPair, StoredKeys};
use pg_cert_store::tls::TlsMode;
use std::{
    collections::{BTreeMap, BTreeSet},
    env,
    path::{Path, PathBuf},
};

pub const CERT_2030: &str = include_str!("../fixtures/alice_2030.pem");
pub const CERT_2031: &str = include_str!("../fixtures/alice_2031.pem");
pub const PRIVATE_KEY: &str = "PRIVATEKEYDATA";

pub fn expires_2030() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

pub fn expires_2031() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 6, 15, 12, 0, 0).unwrap()
}

pub fn skip_if_no_postgres() -> bool {
    env::var("SKIP_POSTGRES_TESTS").is_ok()
}

/// Connection settings for the test container, overridable through the usual `PG*` variables
pub fn postgres_config() -> PgsqlConfig {
    PgsqlConfig {
        host: Some(env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string())),
        port: Some(
            env::var("PGPORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
        ),
        user: Some(env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string())),
        password: Some(env::var("PGPASSWORD").unwrap_or_else(|_| "secret".to_string())),
        dbname: Some(env::var("PGDATABASE").unwrap_or_else(|_| "testdb".to_string())),
        application_name: Some("pg-cert-store-tests".to_string()),
        options: Vec::new(),
        tls: pg_cert_store::tls::TlsConfig {
            mode: TlsMode::Disable,
            ..Default::default()
        },
    }
}

/// Generate a unique schema name for a test
/// Uses the test name, thread ID and process ID to ensure uniqueness across parallel runs
pub fn test_schema_name(test_name: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let thread_id = std::thread::current().id();
    let mut hasher = DefaultHasher::new();
    test_name.hash(&mut hasher);
    format!("{thread_id:?}").hash(&mut hasher);
    std::process::id().hash(&mut hasher);

    format!("certs_test_{:x}", hasher.finish())
}

pub fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pg-cert-store"))
}

/// Write an executable shell script
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i32,
    pub name: String,
    pub public_key: String,
    pub private_key: String,
    pub expires: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// In-memory `CertStore` that records every write and DDL statement
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub schemas: BTreeSet<String>,
    pub tables: BTreeSet<(String, String)>,
    pub rows: BTreeMap<String, Vec<Row>>,
    pub ddl: Vec<String>,
    pub writes: usize,
    next_id: i32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the schema and certs table already in place
    pub fn with_schema(schema: &str) -> Self {
        let mut store = Self::new();
        store.schemas.insert(schema.to_string());
        store
            .tables
            .insert((schema.to_string(), "certs".to_string()));
        store
    }

    pub fn row(&self, schema: &str, name: &str) -> Option<&Row> {
        self.rows
            .get(schema)
            .and_then(|rows| rows.iter().find(|r| r.name == name))
    }

    pub fn row_count(&self, schema: &str) -> usize {
        self.rows.get(schema).map_or(0, Vec::len)
    }

    fn rows_mut(&mut self, schema: &str) -> Result<&mut Vec<Row>> {
        if !self
            .tables
            .contains(&(schema.to_string(), "certs".to_string()))
        {
            anyhow::bail!("relation \"{schema}.certs\" does not exist");
        }
        Ok(self.rows.entry(schema.to_string()).or_default())
    }
}

impl CertStore for MemoryStore {
    async fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        Ok(self.schemas.contains(schema))
    }

    async fn create_schema(&mut self, schema: &str) -> Result<()> {
        if !self.schemas.insert(schema.to_string()) {
            anyhow::bail!("schema \"{schema}\" already exists");
        }
        self.ddl.push(format!("CREATE SCHEMA {schema}"));
        Ok(())
    }

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool> {
        Ok(self
            .tables
            .contains(&(schema.to_string(), table.to_string())))
    }

    async fn create_table(&mut self, schema: &str, table: &Table) -> Result<()> {
        if !self.schemas.contains(schema) {
            anyhow::bail!("schema \"{schema}\" does not exist");
        }
        if !self
            .tables
            .insert((schema.to_string(), table.name.to_string()))
        {
            anyhow::bail!("relation \"{}\" already exists", table.name);
        }
        self.ddl.push(table.create_sql(schema));
        Ok(())
    }

    async fn find_keys_by_name(&mut self, schema: &str, name: &str) -> Result<Option<StoredKeys>> {
        Ok(self.rows_mut(schema)?.iter().find(|r| r.name == name).map(|r| StoredKeys {
            id: r.id,
            public_key: r.public_key.clone(),
            private_key: r.private_key.clone(),
        }))
    }

    async fn find_expiry_by_name(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<Option<CertExpiry>> {
        Ok(self.rows_mut(schema)?.iter().find(|r| r.name == name).map(|r| CertExpiry {
            id: r.id,
            expires: r.expires,
        }))
    }

    async fn fetch_keys(&mut self, schema: &str, id: i32) -> Result<Option<KeyPair>> {
        Ok(self.rows_mut(schema)?.iter().find(|r| r.id == id).map(|r| KeyPair {
            public_key: r.public_key.clone(),
            private_key: r.private_key.clone(),
        }))
    }

    async fn insert_cert(&mut self, schema: &str, cert: &CertWrite<'_>) -> Result<()> {
        self.next_id += 1;
        let id = self.next_id;
        let rows = self.rows_mut(schema)?;
        if rows.iter().any(|r| r.name == cert.name) {
            anyhow::bail!("duplicate key value violates unique constraint \"certs_name_key\"");
        }
        rows.push(Row {
            id,
            name: cert.name.to_string(),
            public_key: cert.public_key.to_string(),
            private_key: cert.private_key.to_string(),
            expires: cert.expires,
            updated: cert.updated,
        });
        self.writes += 1;
        Ok(())
    }

    async fn update_cert(&mut self, schema: &str, id: i32, cert: &CertWrite<'_>) -> Result<()> {
        let row = self
            .rows_mut(schema)?
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("no row with id {id}"))?;
        row.public_key = cert.public_key.to_string();
        row.private_key = cert.private_key.to_string();
        row.expires = cert.expires;
        row.updated = cert.updated;
        self.writes += 1;
        Ok(())
    }
}
