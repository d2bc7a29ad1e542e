//! Logger configuration for service processes: leveled console output, an
//! optional rotating JSON file sink and a root span identifying the service.

pub mod config;
pub mod error;
pub mod logger;

pub use config::{parse_level, FileRotation, LoggerConfig};
pub use error::TelemetryError;
pub use logger::{init_logger, init_test_logger, LoggerGuard, DEFAULT_HOSTNAME};
