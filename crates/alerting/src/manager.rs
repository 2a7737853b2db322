//! Alert Manager Implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::AlertError;

/// Output channel of the alert hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertChannel {
    Sound,
    Haptic,
}

impl fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sound => f.write_str("sound"),
            Self::Haptic => f.write_str("haptic"),
        }
    }
}

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Deliver alerts to sound sinks
    pub sound_enabled: bool,
    /// Deliver alerts to haptic sinks
    pub haptic_enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            haptic_enabled: true,
        }
    }
}

impl AlertConfig {
    pub fn is_enabled(&self, channel: AlertChannel) -> bool {
        match channel {
            AlertChannel::Sound => self.sound_enabled,
            AlertChannel::Haptic => self.haptic_enabled,
        }
    }
}

/// One trigger-alert request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub at: DateTime<Utc>,
    pub fatigue_score: f64,
}

/// External sound/haptic output
pub trait AlertSink: Send {
    fn channel(&self) -> AlertChannel;

    fn fire(&mut self, request: &AlertRequest) -> Result<(), AlertError>;
}

/// Sink that only writes the alert to the log
#[derive(Debug, Clone)]
pub struct LogSink {
    channel: AlertChannel,
}

impl LogSink {
    pub fn new(channel: AlertChannel) -> Self {
        Self { channel }
    }
}

impl AlertSink for LogSink {
    fn channel(&self) -> AlertChannel {
        self.channel
    }

    fn fire(&mut self, request: &AlertRequest) -> Result<(), AlertError> {
        warn!(
            "ALERT ({}): driver appears unsafe to drive (fatigue {:.2})",
            self.channel, request.fatigue_score
        );
        Ok(())
    }
}

/// State of an alert channel
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Last time this channel was fired
    pub last_fired: DateTime<Utc>,
    /// Number of times fired
    pub fire_count: usize,
}

/// Dispatches trigger-alert requests to the registered sinks
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Registered outputs
    sinks: Vec<Box<dyn AlertSink>>,
    /// Alert states by channel
    states: HashMap<AlertChannel, AlertState>,
    /// Requests received, delivered or not
    requests: usize,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            sinks: Vec::new(),
            states: HashMap::new(),
            requests: 0,
        }
    }

    /// Add an output sink
    pub fn register(&mut self, sink: Box<dyn AlertSink>) {
        debug!("Registered {} alert sink", sink.channel());
        self.sinks.push(sink);
    }

    /// Deliver a request to every enabled sink; returns how many accepted it.
    ///
    /// A failing sink is logged and skipped.
    pub fn trigger(&mut self, request: AlertRequest) -> usize {
        self.requests += 1;
        let mut delivered = 0;

        for sink in self.sinks.iter_mut() {
            let channel = sink.channel();
            if !self.config.is_enabled(channel) {
                continue;
            }

            match sink.fire(&request) {
                Ok(()) => {
                    delivered += 1;
                    let state = self.states.entry(channel).or_insert(AlertState {
                        last_fired: request.at,
                        fire_count: 0,
                    });
                    state.last_fired = request.at;
                    state.fire_count += 1;
                }
                Err(e) => warn!("Alert sink {} failed: {}", channel, e),
            }
        }

        delivered
    }

    pub fn state(&self, channel: AlertChannel) -> Option<&AlertState> {
        self.states.get(&channel)
    }

    /// Total trigger requests received
    pub fn request_count(&self) -> usize {
        self.requests
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
