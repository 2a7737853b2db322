//! Monitor settings
//!
//! Loaded from an optional TOML file, then overridden by `FATIGUE__`-prefixed
//! environment variables (e.g. `FATIGUE__DMS__ALERT_SENSITIVITY=0.7`).

use alerting::AlertConfig;
use config::{Config, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::MonitorError;

/// Trip history settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum trips kept in memory; unbounded when unset
    pub retention: Option<usize>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// All monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dms: DmsConfig,
    pub alerts: AlertConfig,
    pub history: HistorySettings,
    pub logging: LoggingConfig,
    /// Bound of the frame/command queue
    pub queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dms: DmsConfig::default(),
            alerts: AlertConfig::default(),
            history: HistorySettings::default(),
            logging: LoggingConfig::default(),
            queue_capacity: 64,
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("FATIGUE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        self.dms.validate()?;
        if self.queue_capacity == 0 {
            return Err(MonitorError::Dms(dms::DmsError::Config(
                "queue_capacity must be at least 1".into(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.dms.alert_sensitivity, 0.5);
        assert!(settings.alerts.sound_enabled);
        assert_eq!(settings.history.retention, None);
    }

    #[test]
    fn test_load_from_file() {
        let path =
            std::env::temp_dir().join(format!("fatigue-settings-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "queue_capacity = 8\n\n[dms]\nalert_sensitivity = 0.8\n\n\
             [alerts]\nhaptic_enabled = false\n\n[history]\nretention = 50"
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.queue_capacity, 8);
        assert_eq!(settings.dms.alert_sensitivity, 0.8);
        assert_eq!(settings.dms.eye_closed_duration_secs, 2.0);
        assert!(!settings.alerts.haptic_enabled);
        assert!(settings.alerts.sound_enabled);
        assert_eq!(settings.history.retention, Some(50));
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("FATIGUE__DMS__YAWN_DURATION_SECS", "2.5");
        std::env::set_var("FATIGUE__LOGGING__LEVEL", "warn");

        let settings = Settings::load(None);
        std::env::remove_var("FATIGUE__DMS__YAWN_DURATION_SECS");
        std::env::remove_var("FATIGUE__LOGGING__LEVEL");

        let settings = settings.unwrap();
        assert_eq!(settings.dms.yawn_duration_secs, 2.5);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.dms.eye_closed_duration_secs, 2.0);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let path = std::env::temp_dir().join(format!("fatigue-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[dms]\nalert_sensitivity = 3.0\n").unwrap();

        let result = Settings::load(Some(&path));
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(MonitorError::Dms(_))));
    }
}
