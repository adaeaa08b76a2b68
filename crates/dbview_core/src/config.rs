//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Read store locations, listener address, backup directory and logging
//!   settings from environment-style key/value pairs.
//! - Reject missing or malformed values before any connection is opened.
//! - Load an optional `.env` file into the process environment first.
//!
//! # Invariants
//! - `DOCSTORE_URI` is mandatory; everything else has a default.
//! - Secrets never appear in `Debug` output.
//! - Variables already set in the environment win over `.env` entries.

use crate::logging::default_log_level;
use log::{info, warn};
use sqlx::postgres::PgSslMode;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DOCSTORE_URI_KEY: &str = "DOCSTORE_URI";
pub const DOCSTORE_DB_KEY: &str = "DOCSTORE_DB";
pub const DEFAULT_DOCSTORE_DB: &str = "Node";
pub const DEFAULT_PORT: u16 = 8181;
const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;

/// Configuration failure; fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "required setting `{key}` is not set"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Where the document store lives.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentStoreLocation {
    /// Private in-memory SQLite store.
    Memory,
    /// Existing SQLite store file.
    File(PathBuf),
    /// MongoDB deployment, kept as the full connection string.
    Mongo(String),
}

impl DocumentStoreLocation {
    /// Accepts `mongodb://...`, `mongodb+srv://...`, `sqlite::memory:`,
    /// `:memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare filesystem
    /// path.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let trimmed = uri.trim();
        let invalid = |reason: &str| ConfigError::Invalid {
            key: DOCSTORE_URI_KEY,
            value: uri.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(ConfigError::Missing(DOCSTORE_URI_KEY));
        }
        if matches!(trimmed, "sqlite::memory:" | ":memory:") {
            return Ok(Self::Memory);
        }
        if trimmed.starts_with("mongodb://") || trimmed.starts_with("mongodb+srv://") {
            return Ok(Self::Mongo(trimmed.to_string()));
        }

        let path = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(invalid(&format!("unsupported scheme `{scheme}`")));
        } else {
            trimmed
        };

        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

impl Debug for DocumentStoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Mongo(uri) => f.debug_tuple("Mongo").field(&redact_uri(uri)).finish(),
        }
    }
}

/// Hides the `user:password@` part of a connection string.
fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://<redacted>@{}", &rest[at + 1..]),
        None => uri.to_string(),
    }
}

impl FromStr for DocumentStoreLocation {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Connection settings for the relational store.
#[derive(Clone)]
pub struct RelationalSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: PgSslMode,
}

impl Debug for RelationalSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub docstore: DocumentStoreLocation,
    /// Database holding the document collections; MongoDB only.
    pub docstore_database: String,
    pub relational: RelationalSettings,
    pub bind_host: String,
    pub port: u16,
    /// Directory receiving snapshot files.
    pub backup_dir: PathBuf,
    pub query_timeout: Duration,
    pub log_level: String,
    /// Rolling log directory; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let docstore_uri = get(DOCSTORE_URI_KEY).ok_or(ConfigError::Missing(DOCSTORE_URI_KEY))?;
        let docstore = DocumentStoreLocation::parse(&docstore_uri)?;

        let ssl_mode = match get("PG_SSLMODE") {
            Some(value) => value.parse::<PgSslMode>().map_err(|err| ConfigError::Invalid {
                key: "PG_SSLMODE",
                value: value.clone(),
                reason: err.to_string(),
            })?,
            None => PgSslMode::Disable,
        };

        let relational = RelationalSettings {
            host: get("PG_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or("PG_PORT", get("PG_PORT"), DEFAULT_PG_PORT)?,
            user: get("PG_USER").unwrap_or_else(|| "postgres".to_string()),
            password: lookup("PG_PASS").unwrap_or_default(),
            database: get("PG_DB").unwrap_or_else(|| "postgres".to_string()),
            ssl_mode,
        };

        let query_timeout_ms = parse_or(
            "QUERY_TIMEOUT_MS",
            get("QUERY_TIMEOUT_MS"),
            DEFAULT_QUERY_TIMEOUT_MS,
        )?;
        if query_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "QUERY_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        Ok(Self {
            docstore,
            docstore_database: get(DOCSTORE_DB_KEY)
                .unwrap_or_else(|| DEFAULT_DOCSTORE_DB.to_string()),
            relational,
            bind_host: get("BIND_HOST").unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            backup_dir: get("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            query_timeout: Duration::from_millis(query_timeout_ms),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }

    /// Socket address the HTTP listener binds.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let candidate = format!("{}:{}", self.bind_host, self.port);
        candidate.parse().map_err(|err| ConfigError::Invalid {
            key: "BIND_HOST",
            value: self.bind_host.clone(),
            reason: format!("{err}"),
        })
    }
}

/// Result of looking for a `.env` file.
#[derive(Debug)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(String),
}

impl DotenvStatus {
    /// Logs the outcome; call after logging is initialized.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => info!(
                "event=dotenv_load module=config status=ok path={}",
                path.display()
            ),
            Self::NotFound => info!("event=dotenv_load module=config status=skipped reason=not_found"),
            Self::Failed(err) => warn!("event=dotenv_load module=config status=error error={err}"),
        }
    }
}

/// Loads `.env` from the working directory or its ancestors.
///
/// A missing or unreadable file is not fatal.
pub fn load_dotenv() -> DotenvStatus {
    classify_dotenv(dotenvy::dotenv())
}

/// Loads the `.env`-style file at `path`.
pub fn load_dotenv_from(path: &Path) -> DotenvStatus {
    classify_dotenv(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn classify_dotenv(outcome: Result<PathBuf, dotenvy::Error>) -> DotenvStatus {
    match outcome {
        Ok(path) => DotenvStatus::Loaded(path),
        Err(err) if err.not_found() => DotenvStatus::NotFound,
        Err(err) => DotenvStatus::Failed(err.to_string()),
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}
