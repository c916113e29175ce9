use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),
}

impl From<opentelemetry::trace::TraceError> for CoreError {
    fn from(err: opentelemetry::trace::TraceError) -> Self {
        CoreError::TelemetryError(err.to_string())
    }
}
