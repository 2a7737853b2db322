//! Driver signal state tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slack for comparing tick-multiple durations against thresholds
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Tracked fatigue condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    EyesClosed,
    Yawning,
    FaceAbsent,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EyesClosed => "eyes_closed",
            Self::Yawning => "yawning",
            Self::FaceAbsent => "face_absent",
        }
    }
}

/// State of one tracked condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    /// Whether the condition currently holds
    pub active: bool,

    /// Time the condition has held, in whole clock ticks (seconds)
    pub duration_accumulated: f64,

    /// When `active` last changed
    pub last_transition: Option<DateTime<Utc>>,

    #[serde(skip)]
    ticks: u64,
}

impl SignalState {
    /// Enter the active state with a fresh duration
    pub(crate) fn activate(&mut self, at: DateTime<Utc>) {
        self.active = true;
        self.ticks = 0;
        self.duration_accumulated = 0.0;
        self.last_transition = Some(at);
    }

    /// Leave the active state; returns the duration it held for
    pub(crate) fn deactivate(&mut self, at: DateTime<Utc>) -> f64 {
        let held = self.duration_accumulated;
        self.active = false;
        self.ticks = 0;
        self.duration_accumulated = 0.0;
        self.last_transition = Some(at);
        held
    }

    /// Advance the duration clock to `now`.
    ///
    /// Counts whole ticks since activation, so a late or early frame never
    /// rewinds the accumulated duration.
    pub(crate) fn advance(&mut self, now: DateTime<Utc>, tick_micros: i64, tick_secs: f64) {
        if !self.active || tick_micros <= 0 {
            return;
        }
        let Some(since) = self.last_transition else {
            return;
        };

        let elapsed = (now - since).num_microseconds().unwrap_or(i64::MAX).max(0);
        let ticks = (elapsed / tick_micros) as u64;
        if ticks > self.ticks {
            self.ticks = ticks;
            self.duration_accumulated = ticks as f64 * tick_secs;
        }
    }

    /// Whether the condition has held for at least `threshold_secs`.
    ///
    /// `ticks * tick_secs` can land just under a threshold that is an exact
    /// tick multiple (3 * 0.3 < 0.9), so the comparison allows rounding slack.
    pub fn held_for(&self, threshold_secs: f64) -> bool {
        self.active && reached(self.duration_accumulated, threshold_secs)
    }

    #[cfg(test)]
    pub(crate) fn held(duration_secs: f64) -> Self {
        Self {
            active: true,
            duration_accumulated: duration_secs,
            ..Default::default()
        }
    }
}

/// `value >= threshold`, tolerant of float rounding in either operand
pub(crate) fn reached(value: f64, threshold: f64) -> bool {
    value >= threshold - THRESHOLD_EPSILON * threshold.abs().max(1.0)
}

/// Snapshot of all tracked conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStates {
    pub eyes_closed: SignalState,
    pub yawning: SignalState,
    pub face_absent: SignalState,
}

impl SignalStates {
    pub fn get(&self, signal: Signal) -> &SignalState {
        match signal {
            Signal::EyesClosed => &self.eyes_closed,
            Signal::Yawning => &self.yawning,
            Signal::FaceAbsent => &self.face_absent,
        }
    }

    pub(crate) fn get_mut(&mut self, signal: Signal) -> &mut SignalState {
        match signal {
            Signal::EyesClosed => &mut self.eyes_closed,
            Signal::Yawning => &mut self.yawning,
            Signal::FaceAbsent => &mut self.face_absent,
        }
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Direction of a signal transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalEdge {
    /// Condition started
    Entered,
    /// Condition ended after holding for `duration_secs`
    Exited { duration_secs: f64 },
}

/// A discrete transition of one signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub signal: Signal,
    pub edge: SignalEdge,
    pub at: DateTime<Utc>,
}

impl SignalEvent {
    /// Eyes reopened: one completed blink
    pub fn is_blink(&self) -> bool {
        self.signal == Signal::EyesClosed && matches!(self.edge, SignalEdge::Exited { .. })
    }

    /// Mouth closed again: one completed yawn
    pub fn is_yawn(&self) -> bool {
        self.signal == Signal::Yawning && matches!(self.edge, SignalEdge::Exited { .. })
    }
}
