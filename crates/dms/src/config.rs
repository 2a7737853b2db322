//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Default sensitivity, at which every threshold is used unscaled
pub const DEFAULT_SENSITIVITY: f64 = 0.5;

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye openness below this ratio counts as closed
    pub eye_closed_openness: f64,

    /// Mouth openness above this ratio counts as yawning
    pub yawn_openness: f64,

    /// Eyes closed longer than this escalate to danger (seconds)
    pub eye_closed_duration_secs: f64,

    /// Yawning longer than this escalates to danger (seconds)
    pub yawn_duration_secs: f64,

    /// Grace period before a missing face raises a warning (seconds)
    pub face_absence_timeout_secs: f64,

    /// Granularity of the duration clock (seconds)
    pub tick_interval_secs: f64,

    /// Alert sensitivity in [0, 1]; higher reacts sooner
    pub alert_sensitivity: f64,

    /// Weight of eye closure in the fatigue score
    pub eye_fatigue_weight: f64,

    /// Weight of yawning in the fatigue score
    pub yawn_fatigue_weight: f64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eye_closed_openness: 0.2,
            yawn_openness: 0.04,
            eye_closed_duration_secs: 2.0,
            yawn_duration_secs: 1.5,
            face_absence_timeout_secs: 3.0,
            tick_interval_secs: 0.1,
            alert_sensitivity: DEFAULT_SENSITIVITY,
            eye_fatigue_weight: 0.6,
            yawn_fatigue_weight: 0.4,
        }
    }
}

/// Effective thresholds after sensitivity scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub eye_closed_openness: f64,
    pub yawn_openness: f64,
    pub eye_closed_duration_secs: f64,
    pub yawn_duration_secs: f64,
    pub face_absence_timeout_secs: f64,
    pub tick_interval_secs: f64,
    pub eye_fatigue_weight: f64,
    pub yawn_fatigue_weight: f64,
}

impl DmsConfig {
    /// Create strict config (reacts sooner)
    pub fn strict() -> Self {
        Self {
            alert_sensitivity: 0.8,
            ..Default::default()
        }
    }

    /// Create lenient config (reacts later)
    pub fn lenient() -> Self {
        Self {
            alert_sensitivity: 0.2,
            ..Default::default()
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), DmsError> {
        let positive = [
            ("eye_closed_openness", self.eye_closed_openness),
            ("yawn_openness", self.yawn_openness),
            ("eye_closed_duration_secs", self.eye_closed_duration_secs),
            ("yawn_duration_secs", self.yawn_duration_secs),
            ("face_absence_timeout_secs", self.face_absence_timeout_secs),
            ("tick_interval_secs", self.tick_interval_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DmsError::Config(format!("{name} must be positive, got {value}")));
            }
        }

        if !(0.0..=1.0).contains(&self.alert_sensitivity) {
            return Err(DmsError::Config(format!(
                "alert_sensitivity must be within [0, 1], got {}",
                self.alert_sensitivity
            )));
        }

        let weight_ok = |w: f64| w.is_finite() && w >= 0.0;
        if !weight_ok(self.eye_fatigue_weight) || !weight_ok(self.yawn_fatigue_weight) {
            return Err(DmsError::Config("fatigue weights must be finite and non-negative".into()));
        }

        Ok(())
    }

    /// Apply the sensitivity scalar to the configured thresholds.
    ///
    /// At the default sensitivity every value is returned unchanged. Raising
    /// sensitivity shortens the duration thresholds, widens the eye-closed band
    /// and narrows the yawn band.
    pub fn thresholds(&self) -> Thresholds {
        let s = self.alert_sensitivity.clamp(0.0, 1.0);
        let shrink = 1.5 - s;
        let grow = 0.5 + s;

        Thresholds {
            eye_closed_openness: self.eye_closed_openness * grow,
            yawn_openness: self.yawn_openness * shrink,
            eye_closed_duration_secs: self.eye_closed_duration_secs * shrink,
            yawn_duration_secs: self.yawn_duration_secs * shrink,
            face_absence_timeout_secs: self.face_absence_timeout_secs * shrink,
            tick_interval_secs: self.tick_interval_secs,
            eye_fatigue_weight: self.eye_fatigue_weight,
            yawn_fatigue_weight: self.yawn_fatigue_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sensitivity_is_unscaled() {
        let config = DmsConfig::default();
        let t = config.thresholds();

        assert_eq!(t.eye_closed_openness, 0.2);
        assert_eq!(t.yawn_openness, 0.04);
        assert_eq!(t.eye_closed_duration_secs, 2.0);
        assert_eq!(t.yawn_duration_secs, 1.5);
        assert_eq!(t.face_absence_timeout_secs, 3.0);
        assert_eq!(t.tick_interval_secs, 0.1);
    }

    #[test]
    fn test_sensitivity_factors() {
        let config = DmsConfig {
            alert_sensitivity: 0.8,
            ..Default::default()
        };
        let t = config.thresholds();

        // Durations and yawn openness scale by 1.5 - s, eye openness by 0.5 + s
        assert!((t.eye_closed_duration_secs - 2.0 * 0.7).abs() < 1e-12);
        assert!((t.yawn_duration_secs - 1.5 * 0.7).abs() < 1e-12);
        assert!((t.face_absence_timeout_secs - 3.0 * 0.7).abs() < 1e-12);
        assert!((t.yawn_openness - 0.04 * 0.7).abs() < 1e-12);
        assert!((t.eye_closed_openness - 0.2 * 1.3).abs() < 1e-12);
        assert_eq!(t.tick_interval_secs, 0.1);

        let least = DmsConfig {
            alert_sensitivity: 0.0,
            ..Default::default()
        }
        .thresholds();
        assert!((least.eye_closed_duration_secs - 3.0).abs() < 1e-12);
        assert!((least.eye_closed_openness - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_strict_reacts_sooner() {
        let strict = DmsConfig::strict().thresholds();
        let lenient = DmsConfig::lenient().thresholds();

        assert!(strict.eye_closed_duration_secs < lenient.eye_closed_duration_secs);
        assert!(strict.eye_closed_openness > lenient.eye_closed_openness);
        assert!(strict.yawn_openness < lenient.yawn_openness);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(DmsConfig::default().validate().is_ok());

        let zero_tick = DmsConfig {
            tick_interval_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(zero_tick.validate(), Err(DmsError::Config(_))));

        let sensitivity = DmsConfig {
            alert_sensitivity: 1.5,
            ..Default::default()
        };
        assert!(sensitivity.validate().is_err());

        let weights = DmsConfig {
            yawn_fatigue_weight: -0.1,
            ..Default::default()
        };
        assert!(weights.validate().is_err());

        let nan_weight = DmsConfig {
            eye_fatigue_weight: f64::NAN,
            ..Default::default()
        };
        assert!(nan_weight.validate().is_err());
    }
}
