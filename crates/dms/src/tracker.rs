//! Temporal signal tracker
//!
//! Folds frame observations into the eyes-closed, yawning and face-absent
//! signals. Durations advance on a logical clock of fixed ticks sampled from
//! frame timestamps, so they do not depend on the camera frame rate.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::analysis::{FaceReading, FrameObservation};
use crate::config::Thresholds;
use crate::state::{reached, Signal, SignalEdge, SignalEvent, SignalStates};

/// Maintains signal states across frames
#[derive(Debug, Clone)]
pub struct SignalTracker {
    thresholds: Thresholds,
    tick_micros: i64,
    states: SignalStates,
    last_face_seen: Option<DateTime<Utc>>,
    last_frame: Option<DateTime<Utc>>,
}

impl SignalTracker {
    pub fn new(thresholds: Thresholds) -> Self {
        let tick_micros = (thresholds.tick_interval_secs * 1_000_000.0).round() as i64;
        Self {
            thresholds,
            tick_micros: tick_micros.max(1),
            states: SignalStates::default(),
            last_face_seen: None,
            last_frame: None,
        }
    }

    /// Current signal snapshot
    pub fn states(&self) -> &SignalStates {
        &self.states
    }

    /// Last time a face was visible
    pub fn last_face_seen(&self) -> Option<DateTime<Utc>> {
        self.last_face_seen
    }

    /// Fold one frame into the signals and return the edges it produced
    pub fn update(&mut self, obs: &FrameObservation) -> Vec<SignalEvent> {
        let now = obs.timestamp;
        if let Some(prev) = self.last_frame {
            if now < prev {
                warn!("Frame timestamp {} precedes previous frame {}", now, prev);
            }
        }
        self.last_frame = Some(self.last_frame.map_or(now, |prev| prev.max(now)));

        self.advance(now);

        let mut events = Vec::new();
        match &obs.face {
            Some(reading) => self.on_face(now, reading, &mut events),
            None => self.on_no_face(now, &mut events),
        }
        events
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        self.states.reset();
        self.last_face_seen = None;
        self.last_frame = None;
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        let tick_secs = self.thresholds.tick_interval_secs;
        for signal in [Signal::EyesClosed, Signal::Yawning, Signal::FaceAbsent] {
            self.states.get_mut(signal).advance(now, self.tick_micros, tick_secs);
        }
    }

    fn on_no_face(&mut self, now: DateTime<Utc>, events: &mut Vec<SignalEvent>) {
        // The grace period starts with the first frame seen
        let last_seen = *self.last_face_seen.get_or_insert(now);

        if self.states.face_absent.active {
            return;
        }

        let absent_secs = micros_to_secs(now - last_seen);
        if reached(absent_secs, self.thresholds.face_absence_timeout_secs) {
            debug!("Face absent for {:.1}s", absent_secs);
            self.set(Signal::FaceAbsent, true, now, events);
        }
    }

    fn on_face(
        &mut self,
        now: DateTime<Utc>,
        reading: &FaceReading,
        events: &mut Vec<SignalEvent>,
    ) {
        self.last_face_seen = Some(now);
        self.set(Signal::FaceAbsent, false, now, events);

        if let Some(openness) = reading.eye_openness {
            let closed = openness < self.thresholds.eye_closed_openness;
            self.set(Signal::EyesClosed, closed, now, events);
        }

        if let Some(openness) = reading.mouth_openness {
            let yawning = openness > self.thresholds.yawn_openness;
            self.set(Signal::Yawning, yawning, now, events);
        }
    }

    fn set(
        &mut self,
        signal: Signal,
        active: bool,
        now: DateTime<Utc>,
        events: &mut Vec<SignalEvent>,
    ) {
        let state = self.states.get_mut(signal);
        if state.active == active {
            return;
        }

        let edge = if active {
            state.activate(now);
            SignalEdge::Entered
        } else {
            let duration_secs = state.deactivate(now);
            SignalEdge::Exited { duration_secs }
        };

        debug!("Signal {} {:?}", signal.as_str(), edge);
        events.push(SignalEvent { signal, edge, at: now });
    }
}

fn micros_to_secs(delta: chrono::Duration) -> f64 {
    delta.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
}
