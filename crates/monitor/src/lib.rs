//! Fatigue Monitor
//!
//! Runs the per-frame fatigue pipeline as a single serialized mutation
//! domain and publishes its state to observers.

pub mod logging;
pub mod pipeline;
pub mod replay;
pub mod service;
pub mod settings;

pub use logging::init_logging;
pub use pipeline::{FrameReport, LandmarkFrame, MonitorEvent, MonitorPipeline, MonitorSnapshot};
pub use service::{MonitorHandle, MonitorService};
pub use settings::{HistorySettings, LoggingConfig, Settings};

use thiserror::Error;

/// Monitor error types
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Dms(#[from] dms::DmsError),

    #[error(transparent)]
    Session(#[from] trip_stats::SessionError),

    #[error("Monitor service is not running")]
    ChannelClosed,

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed recording at line {line}: {source}")]
    Recording {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
