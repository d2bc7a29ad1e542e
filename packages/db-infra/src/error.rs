use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Shared handle to an error produced by a driver.
///
/// Cached connect failures are replayed to every later caller of the same
/// generation, so the underlying error lives behind an `Arc`.
#[derive(Clone)]
pub struct DriverError(Arc<dyn StdError + Send + Sync + 'static>);

impl DriverError {
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(Message(message.into())))
    }

    /// True when both handles point at the same underlying error value.
    pub fn same_as(&self, other: &DriverError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for DriverError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

#[derive(Debug, Clone, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("connect failed: invalid configuration: {source}")]
    ConfigInvalid { source: DriverError },
    #[error("connect failed: {source}")]
    ConnectFailed { source: DriverError },
    #[error("connect failed: liveness probe failed: {source}")]
    ProbeFailed { source: DriverError },
    /// Liveness check of an already installed client.
    #[error("ping failed: {source}")]
    PingFailed { source: DriverError },
    #[error("not connected")]
    NotConnected,
    #[error("close failed: {source}")]
    CloseFailed { source: DriverError },
    #[error("migration failed: {message}")]
    Migration { message: String },
    #[error("io error: {message}")]
    Io { message: String },
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::ConfigInvalid {
            source: DriverError::new(err),
        }
    }

    pub fn connect_failed<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::ConnectFailed {
            source: DriverError::new(err),
        }
    }

    pub fn probe_failed(source: DriverError) -> Self {
        Self::ProbeFailed { source }
    }

    /// The driver error carried by the connect and ping variants, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::ConfigInvalid { source }
            | Self::ConnectFailed { source }
            | Self::ProbeFailed { source }
            | Self::PingFailed { source } => Some(source),
            _ => None,
        }
    }

    /// Identity comparison used to check that a cached failure is replayed
    /// rather than reproduced.
    pub fn same_as(&self, other: &DbInfraError) -> bool {
        match (self.driver_error(), other.driver_error()) {
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        }
    }
}
