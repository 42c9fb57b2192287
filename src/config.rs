use crate::tls::{TlsConfig, TlsMode};
use ini::{Ini, ParseOption};
use std::{
    io::Read,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/pg-cert-store/config.conf";
pub const DEFAULT_HOOKS_DIR: &str = "/etc/pg-cert-store/hooks.d";
pub const DEFAULT_SCHEMA: &str = "public";

const PGSQL_SECTION: &str = "pgsql";
const SYNC_SECTION: &str = "pg_sync";

// PostgreSQL limits identifiers to NAMEDATALEN - 1 bytes
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("Config file is missing {0} section")]
    MissingSection(&'static str),
    #[error("unknown key \"{key}\" in [{section}] section")]
    UnknownKey { section: &'static str, key: String },
    #[error("invalid value \"{value}\" for \"{key}\" in [{section}] section: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide defaults, passed in rather than read from globals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub config_path: PathBuf,
    pub hooks_dir: PathBuf,
    pub schema: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            hooks_dir: PathBuf::from(DEFAULT_HOOKS_DIR),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

/// Connection parameters from the `[pgsql]` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgsqlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    pub application_name: Option<String>,
    /// Run-time parameters from libpq's `options` keyword, as `(name, value)`
    pub options: Vec<(String, String)>,
    pub tls: TlsConfig,
}

/// Settings from the optional `[pg_sync]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub schema: String,
    pub hooks_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pgsql: PgsqlConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Load and validate the config file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not validate
    pub fn load(path: &Path, defaults: &Defaults) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, defaults)
    }

    /// Read the whole stream and parse it
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read or does not validate
    pub fn from_reader<R: Read>(mut reader: R, defaults: &Defaults) -> Result<Self, ConfigError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| ConfigError::Read {
                path: PathBuf::from("<stream>"),
                source,
            })?;
        Self::parse(&text, defaults)
    }

    /// Parse INI text into a validated config
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid INI, the `pgsql` section is
    /// missing, or any known key holds an invalid value
    pub fn parse(text: &str, defaults: &Defaults) -> Result<Self, ConfigError> {
        // values are connection arguments: keep backslashes and quotes as written
        let opt = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, opt).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let pgsql = ini
            .section(Some(PGSQL_SECTION))
            .ok_or(ConfigError::MissingSection(PGSQL_SECTION))?;
        let pgsql = parse_pgsql(pgsql.iter())?;

        let sync = match ini.section(Some(SYNC_SECTION)) {
            Some(section) => parse_sync(section.iter(), defaults)?,
            None => SyncConfig {
                schema: defaults.schema.clone(),
                hooks_dir: defaults.hooks_dir.clone(),
            },
        };
        validate_schema(&sync.schema)?;

        Ok(Self { pgsql, sync })
    }
}

fn parse_pgsql<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> Result<PgsqlConfig, ConfigError> {
    let mut config = PgsqlConfig::default();

    for (key, value) in entries {
        let value = value.trim().to_string();
        match key.trim().to_lowercase().as_str() {
            "host" => config.host = Some(value),
            "port" => {
                let port = value.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                    section: PGSQL_SECTION,
                    key: "port",
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
                config.port = Some(port);
            }
            "user" => config.user = Some(value),
            "password" => config.password = Some(value),
            "dbname" | "database" => config.dbname = Some(value),
            "application_name" => config.application_name = Some(value),
            "options" => {
                config.options =
                    parse_options(&value).map_err(|reason| ConfigError::InvalidValue {
                        section: PGSQL_SECTION,
                        key: "options",
                        value: value.clone(),
                        reason,
                    })?;
            }
            "sslmode" => {
                config.tls.mode =
                    value
                        .parse::<TlsMode>()
                        .map_err(|reason| ConfigError::InvalidValue {
                            section: PGSQL_SECTION,
                            key: "sslmode",
                            value: value.clone(),
                            reason,
                        })?;
            }
            "sslrootcert" => config.tls.ca = Some(PathBuf::from(value)),
            "sslcert" => config.tls.cert = Some(PathBuf::from(value)),
            "sslkey" => config.tls.key = Some(PathBuf::from(value)),
            other => {
                warn!(
                    "Ignoring unsupported connection parameter \"{other}\" in [{PGSQL_SECTION}] section"
                );
            }
        }
    }

    match (&config.tls.cert, &config.tls.key) {
        (Some(cert), None) => Err(ConfigError::InvalidValue {
            section: PGSQL_SECTION,
            key: "sslcert",
            value: cert.display().to_string(),
            reason: "sslkey is required with sslcert".to_string(),
        }),
        (None, Some(key)) => Err(ConfigError::InvalidValue {
            section: PGSQL_SECTION,
            key: "sslkey",
            value: key.display().to_string(),
            reason: "sslcert is required with sslkey".to_string(),
        }),
        _ => Ok(config),
    }
}

/// Split libpq's `options` string (`-c name=value`, `-cname=value` or
/// `--name=value`, whitespace separated) into run-time parameters
fn parse_options(value: &str) -> Result<Vec<(String, String)>, String> {
    let mut params = Vec::new();
    let mut tokens = value.split_whitespace();

    while let Some(token) = tokens.next() {
        let setting = if token == "-c" {
            tokens
                .next()
                .ok_or_else(|| "\"-c\" without a setting".to_string())?
        } else if let Some(rest) = token.strip_prefix("--") {
            rest
        } else if let Some(rest) = token.strip_prefix("-c") {
            rest
        } else {
            return Err(format!("unsupported option \"{token}\""));
        };

        let (name, value) = setting
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got \"{setting}\""))?;
        if name.is_empty() {
            return Err(format!("missing parameter name in \"{setting}\""));
        }
        params.push((name.replace('-', "_"), value.to_string()));
    }

    Ok(params)
}

fn parse_sync<'a>(
    entries: impl Iterator<Item = (&'a str, &'a str)>,
    defaults: &Defaults,
) -> Result<SyncConfig, ConfigError> {
    let mut config = SyncConfig {
        schema: defaults.schema.clone(),
        hooks_dir: defaults.hooks_dir.clone(),
    };

    for (key, value) in entries {
        match key.trim().to_lowercase().as_str() {
            "schema" => config.schema = value.trim().to_string(),
            "hooks_dir" => config.hooks_dir = PathBuf::from(value.trim()),
            other => {
                return Err(ConfigError::UnknownKey {
                    section: SYNC_SECTION,
                    key: other.to_string(),
                });
            }
        }
    }

    Ok(config)
}

/// Only plain lower-case identifiers, so catalog lookups and DDL agree on the name
fn validate_schema(schema: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        section: SYNC_SECTION,
        key: "schema",
        value: schema.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = schema.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(c) if !(c.is_ascii_lowercase() || c == '_') => {
            return Err(invalid("must start with a lower-case letter or underscore"));
        }
        Some(_) => {}
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(invalid(
            "only lower-case letters, digits and underscores are allowed",
        ));
    }

    if schema.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("longer than 63 bytes"));
    }

    Ok(())
}
