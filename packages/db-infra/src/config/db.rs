use std::env;
use std::fmt;

use serde::Deserialize;

use crate::error::DbInfraError;

/// Statement logging verbosity for the relational driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    Error,
    Warn,
    Info,
    #[default]
    Silent,
}

impl LogMode {
    /// Case-insensitive; anything unrecognised is `Silent`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => LogMode::Error,
            "warn" => LogMode::Warn,
            "info" => LogMode::Info,
            _ => LogMode::Silent,
        }
    }
}

impl<'de> Deserialize<'de> for LogMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(LogMode::parse(&raw))
    }
}

/// Connection parameters for the relational backend.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub database: String,
    pub host: String,
    pub username: String,
    pub password: String,
    /// Extra driver parameters, `k=v` pairs separated by spaces or `&`.
    pub params: String,
    pub log_mode: LogMode,
    pub port: u16,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub debug_enabled: bool,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("params", &self.params)
            .field("log_mode", &self.log_mode)
            .field("port", &self.port)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_open_conns", &self.max_open_conns)
            .field("debug_enabled", &self.debug_enabled)
            .finish()
    }
}

impl PostgresConfig {
    /// Read `<PREFIX>_DATABASE`, `<PREFIX>_HOST`, `<PREFIX>_USERNAME` and
    /// `<PREFIX>_PASSWORD` (required) plus `<PREFIX>_PORT` (default 5432),
    /// `<PREFIX>_PARAMS`, `<PREFIX>_LOG_MODE`, `<PREFIX>_MAX_IDLE_CONNS`,
    /// `<PREFIX>_MAX_OPEN_CONNS` and `<PREFIX>_DEBUG_ENABLED`.
    pub fn from_env(prefix: &str) -> Result<Self, DbInfraError> {
        Ok(Self {
            database: must_var(&key(prefix, "DATABASE"))?,
            host: must_var(&key(prefix, "HOST"))?,
            username: must_var(&key(prefix, "USERNAME"))?,
            password: must_var(&key(prefix, "PASSWORD"))?,
            params: opt_var(&key(prefix, "PARAMS")).unwrap_or_default(),
            log_mode: opt_var(&key(prefix, "LOG_MODE"))
                .map(|v| LogMode::parse(&v))
                .unwrap_or_default(),
            port: parsed_var(&key(prefix, "PORT"))?.unwrap_or(5432),
            max_idle_conns: parsed_var(&key(prefix, "MAX_IDLE_CONNS"))?.unwrap_or(0),
            max_open_conns: parsed_var(&key(prefix, "MAX_OPEN_CONNS"))?.unwrap_or(0),
            debug_enabled: parsed_var(&key(prefix, "DEBUG_ENABLED"))?.unwrap_or(false),
        })
    }
}

/// Connection parameters for the document-store backend.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .field("max_pool_size", &self.max_pool_size)
            .field("min_pool_size", &self.min_pool_size)
            .finish()
    }
}

impl MongoConfig {
    /// Read `<PREFIX>_URI` (required) plus `<PREFIX>_USERNAME`,
    /// `<PREFIX>_PASSWORD`, `<PREFIX>_MAX_POOL_SIZE` and `<PREFIX>_MIN_POOL_SIZE`.
    pub fn from_env(prefix: &str) -> Result<Self, DbInfraError> {
        Ok(Self {
            uri: must_var(&key(prefix, "URI"))?,
            username: opt_var(&key(prefix, "USERNAME")).unwrap_or_default(),
            password: opt_var(&key(prefix, "PASSWORD")).unwrap_or_default(),
            max_pool_size: parsed_var(&key(prefix, "MAX_POOL_SIZE"))?.unwrap_or(0),
            min_pool_size: parsed_var(&key(prefix, "MIN_POOL_SIZE"))?.unwrap_or(0),
        })
    }
}

fn key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

/// Get required environment variable or return error
fn must_var(name: &str) -> Result<String, DbInfraError> {
    env::var(name).map_err(|_| {
        DbInfraError::config(format!(
            "Required environment variable '{name}' is not set"
        ))
    })
}

fn opt_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>, DbInfraError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match opt_var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            DbInfraError::config(format!(
                "Environment variable '{name}' has invalid value '{raw}': {e}"
            ))
        }),
    }
}
