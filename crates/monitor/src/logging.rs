//! Logging initialization

use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::LoggingConfig;
use crate::MonitorError;

/// Initialize logging; `RUST_LOG` takes precedence over the configured level
pub fn init_logging(config: &LoggingConfig) -> Result<(), MonitorError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| MonitorError::Logging(e.to_string()))?;

    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| MonitorError::Logging(e.to_string()))
}
