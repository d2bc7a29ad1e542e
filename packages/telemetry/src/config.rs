use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::LevelFilter;

use crate::error::TelemetryError;

/// How often the log file sink starts a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl FileRotation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minutely" => Some(FileRotation::Minutely),
            "hourly" => Some(FileRotation::Hourly),
            "daily" => Some(FileRotation::Daily),
            "never" => Some(FileRotation::Never),
            _ => None,
        }
    }
}

impl From<FileRotation> for Rotation {
    fn from(value: FileRotation) -> Self {
        match value {
            FileRotation::Minutely => Rotation::MINUTELY,
            FileRotation::Hourly => Rotation::HOURLY,
            FileRotation::Daily => Rotation::DAILY,
            FileRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// `info`, `warn` or `error`; anything else logs at `debug`.
    pub level: String,
    pub file_enabled: bool,
    pub file_path: PathBuf,
    /// Rotated files kept on disk. Zero keeps all of them.
    pub file_max_backups: usize,
    pub file_rotation: FileRotation,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_path: PathBuf::from("logs/service.log"),
            file_max_backups: 7,
            file_rotation: FileRotation::Daily,
        }
    }
}

impl LoggerConfig {
    /// Read `<PREFIX>_LEVEL`, `<PREFIX>_FILE_ENABLED`, `<PREFIX>_FILE_PATH`,
    /// `<PREFIX>_FILE_MAX_BACKUPS` and `<PREFIX>_FILE_ROTATION`. Unset
    /// variables keep their defaults.
    pub fn from_env(prefix: &str) -> Result<Self, TelemetryError> {
        let defaults = Self::default();

        let file_rotation = match opt_var(&key(prefix, "FILE_ROTATION")) {
            None => defaults.file_rotation,
            Some(raw) => FileRotation::parse(&raw).ok_or_else(|| {
                TelemetryError::config(format!(
                    "Environment variable '{}' has invalid value '{raw}'",
                    key(prefix, "FILE_ROTATION")
                ))
            })?,
        };

        Ok(Self {
            level: opt_var(&key(prefix, "LEVEL")).unwrap_or(defaults.level),
            file_enabled: parsed_var(&key(prefix, "FILE_ENABLED"))?
                .unwrap_or(defaults.file_enabled),
            file_path: opt_var(&key(prefix, "FILE_PATH"))
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
            file_max_backups: parsed_var(&key(prefix, "FILE_MAX_BACKUPS"))?
                .unwrap_or(defaults.file_max_backups),
            file_rotation,
        })
    }

    pub fn level_filter(&self) -> LevelFilter {
        parse_level(&self.level)
    }
}

/// Case-insensitive `info`, `warn` or `error`; everything else is `debug`.
pub fn parse_level(value: &str) -> LevelFilter {
    match value.trim().to_ascii_lowercase().as_str() {
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::DEBUG,
    }
}

fn key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

fn opt_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>, TelemetryError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match opt_var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            TelemetryError::config(format!(
                "Environment variable '{name}' has invalid value '{raw}': {e}"
            ))
        }),
    }
}
