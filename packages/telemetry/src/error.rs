use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("log file sink could not be created: {0}")]
    FileSink(#[from] tracing_appender::rolling::InitError),

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

impl TelemetryError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
