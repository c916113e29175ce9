pub mod config;
pub mod error;
pub mod managers;
pub mod models;
pub mod services;
pub mod startup;

use config::Config;
use service_core::error::CoreError;

pub use error::XeroError;

/// Install the tracing subscriber described by the logging configuration.
pub fn init_tracing(config: &Config) -> Result<(), CoreError> {
    service_core::observability::init_tracing(
        &config.service_name,
        &config.logging.level,
        config.logging.otlp_endpoint.as_deref(),
    )
}
