//! Alerting System
//!
//! Delivers trigger-alert requests to sound and haptic outputs.

mod manager;

pub use manager::{
    AlertChannel, AlertConfig, AlertManager, AlertRequest, AlertSink, AlertState, LogSink,
};

use thiserror::Error;

/// Alert delivery errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Alert sink failed: {0}")]
    Sink(String),
}
