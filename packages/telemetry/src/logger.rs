//! Process-wide logger installation.
//!
//! Console output is human-readable. When the file sink is enabled every event
//! is also written as one JSON object per line to a rolling file through a
//! non-blocking writer. `RUST_LOG` directives take precedence over the
//! configured level.

use std::future::Future;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::instrument::Instrumented;
use tracing::{info, info_span, Instrument, Span};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggerConfig;
use crate::error::TelemetryError;

pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Keeps the file sink flushing and carries the service's root span.
///
/// Dropping the guard flushes buffered file output; keep it alive for the
/// lifetime of the process.
#[must_use = "dropping the guard stops the file sink"]
pub struct LoggerGuard {
    span: Span,
    _file: Option<WorkerGuard>,
}

impl LoggerGuard {
    /// Span with `hostname`, `service` and `version` fields.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `fut` inside the service span.
    pub fn instrument<F: Future>(&self, fut: F) -> Instrumented<F> {
        fut.instrument(self.span.clone())
    }
}

/// Install the global logger for service `name` at `version`.
///
/// The layers themselves carry no service identity. `hostname`, `service`
/// and `version` appear only on events recorded inside the guard's span,
/// entered through [`LoggerGuard::span`] or [`LoggerGuard::instrument`].
/// Events from code outside that span, including tasks spawned without it,
/// are logged without those fields.
pub fn init_logger(
    config: &LoggerConfig,
    name: &str,
    version: &str,
) -> Result<LoggerGuard, TelemetryError> {
    let level = config.level_filter();
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);

    let (file_layer, file_guard) = match file_writer(config)? {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_ansi(false)
                .with_current_span(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)?;

    let hostname = resolve_hostname();
    let span = info_span!(
        "service",
        hostname = %hostname,
        service = %name,
        version = %version
    );

    info!(
        parent: &span,
        logger = "ready",
        level = %level,
        file_enabled = config.file_enabled
    );

    Ok(LoggerGuard {
        span,
        _file: file_guard,
    })
}

static TEST_LOGGER: OnceCell<()> = OnceCell::new();

/// Logger for test binaries.
///
/// Silent unless `TEST_LOG` holds filter directives, in which case output goes
/// through the test writer so the harness captures it. Safe to call from
/// every test.
pub fn init_test_logger() {
    TEST_LOGGER.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("off"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

pub(crate) fn file_writer(
    config: &LoggerConfig,
) -> Result<Option<(NonBlocking, WorkerGuard)>, TelemetryError> {
    if !config.file_enabled {
        return Ok(None);
    }

    let (dir, prefix) = split_file_path(&config.file_path)?;
    let mut builder = RollingFileAppender::builder()
        .rotation(config.file_rotation.into())
        .filename_prefix(prefix);
    if config.file_max_backups > 0 {
        builder = builder.max_log_files(config.file_max_backups);
    }
    let appender = builder.build(dir)?;

    Ok(Some(tracing_appender::non_blocking(appender)))
}

fn split_file_path(path: &Path) -> Result<(PathBuf, String), TelemetryError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            TelemetryError::config(format!(
                "log file path '{}' does not name a file",
                path.display()
            ))
        })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, file_name.to_string()))
}

fn resolve_hostname() -> String {
    let host = gethostname::gethostname();
    let host = host.to_string_lossy();
    let host = host.trim();
    if host.is_empty() {
        DEFAULT_HOSTNAME.to_string()
    } else {
        host.to_string()
    }
}
