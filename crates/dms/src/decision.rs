//! Alert level decision

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::state::SignalStates;

/// Driver alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    #[default]
    Normal,
    Warning,
    Danger,
}

impl AlertLevel {
    /// Message shown to the driver
    pub fn display_text(&self) -> &'static str {
        match self {
            Self::Normal => "Alert & Safe",
            Self::Warning => "Showing Signs of Fatigue",
            Self::Danger => "TAKE A BREAK - UNSAFE TO DRIVE",
        }
    }

    pub fn short_text(&self) -> &'static str {
        match self {
            Self::Normal => "Safe",
            Self::Warning => "Caution",
            Self::Danger => "Danger",
        }
    }
}

/// Coarse classification of a fatigue score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueBand {
    Low,
    Moderate,
    High,
}

impl FatigueBand {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            Self::Low
        } else if score < 0.6 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

/// Outcome of evaluating one signal snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub level: AlertLevel,
    /// Request the external alert hook (sound/haptic) for this frame
    pub trigger_alert: bool,
    /// Current drowsiness intensity in [0, 1]
    pub fatigue_score: f64,
}

/// Maps signal states to an alert decision.
///
/// Implementations must not mutate tracker state; any damping of level
/// changes belongs here.
pub trait AlertPolicy: Send {
    fn decide(&self, signals: &SignalStates) -> AlertDecision;
}

/// Level-triggered threshold rules, re-evaluated from scratch on every frame
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    thresholds: Thresholds,
}

impl ThresholdPolicy {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Weighted share of each active signal's duration threshold, in [0, 1]
    pub fn fatigue_score(&self, signals: &SignalStates) -> f64 {
        let t = &self.thresholds;
        let eyes = progress(
            signals.eyes_closed.duration_accumulated,
            t.eye_closed_duration_secs,
        );
        let yawn = progress(signals.yawning.duration_accumulated, t.yawn_duration_secs);

        let score = t.eye_fatigue_weight * eyes + t.yawn_fatigue_weight * yawn;
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }

    fn level(&self, signals: &SignalStates) -> AlertLevel {
        let t = &self.thresholds;

        // Face loss alone never escalates past a warning
        if signals.face_absent.active {
            return AlertLevel::Warning;
        }

        if signals.eyes_closed.held_for(t.eye_closed_duration_secs)
            || signals.yawning.held_for(t.yawn_duration_secs)
        {
            AlertLevel::Danger
        } else if signals.eyes_closed.active || signals.yawning.active {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }
}

impl AlertPolicy for ThresholdPolicy {
    fn decide(&self, signals: &SignalStates) -> AlertDecision {
        let level = self.level(signals);
        AlertDecision {
            level,
            trigger_alert: level == AlertLevel::Danger,
            fatigue_score: self.fatigue_score(signals),
        }
    }
}

fn progress(duration: f64, threshold: f64) -> f64 {
    if threshold <= f64::EPSILON {
        return if duration > 0.0 { 1.0 } else { 0.0 };
    }
    (duration / threshold).min(1.0)
}
