//! Per-frame analysis results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decision::{AlertDecision, AlertLevel};
use crate::detector::{FaceLandmarks, Point};
use crate::geometry;
use crate::state::{SignalEvent, SignalStates};
use crate::DmsError;

/// Openness ratios measured on a visible face.
///
/// A field is `None` when the region was not localized, which the tracker
/// treats as "no new information" for that signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceReading {
    /// Mean eye aspect ratio of both eyes
    pub eye_openness: Option<f64>,
    /// Mouth aspect ratio
    pub mouth_openness: Option<f64>,
}

/// One analyzed camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    pub timestamp: DateTime<Utc>,
    /// `None` when no face was detected
    pub face: Option<FaceReading>,
}

impl FrameObservation {
    pub fn with_face(timestamp: DateTime<Utc>, reading: FaceReading) -> Self {
        Self {
            timestamp,
            face: Some(reading),
        }
    }

    pub fn no_face(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            face: None,
        }
    }

    pub fn face_present(&self) -> bool {
        self.face.is_some()
    }
}

/// Complete DMS result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmsAnalysis {
    pub observation: FrameObservation,

    /// Signal states after this frame
    pub signals: SignalStates,

    /// Signal edges produced by this frame
    pub events: Vec<SignalEvent>,

    pub decision: AlertDecision,
}

impl DmsAnalysis {
    pub fn level(&self) -> AlertLevel {
        self.decision.level
    }

    /// Blinks completed on this frame
    pub fn blinks(&self) -> usize {
        self.events.iter().filter(|e| e.is_blink()).count()
    }

    /// Yawns completed on this frame
    pub fn yawns(&self) -> usize {
        self.events.iter().filter(|e| e.is_yawn()).count()
    }
}

/// Turns detector landmarks into openness readings
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceAnalyzer;

impl FaceAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze the provider result for one frame
    pub fn observe(
        &self,
        timestamp: DateTime<Utc>,
        face: Option<&FaceLandmarks>,
    ) -> FrameObservation {
        match face {
            Some(landmarks) => FrameObservation::with_face(timestamp, self.analyze(landmarks)),
            None => FrameObservation::no_face(timestamp),
        }
    }

    /// Compute openness ratios for a detected face
    pub fn analyze(&self, landmarks: &FaceLandmarks) -> FaceReading {
        let eye_openness = match (&landmarks.left_eye, &landmarks.right_eye) {
            (Some(left), Some(right)) => {
                let left = measured(geometry::eye_openness, left);
                let right = measured(geometry::eye_openness, right);
                Some((left + right) / 2.0)
            }
            _ => None,
        };

        let mouth_openness = landmarks
            .outer_lips
            .as_deref()
            .map(|lips| measured(geometry::mouth_openness, lips));

        FaceReading {
            eye_openness,
            mouth_openness,
        }
    }
}

fn measured(ratio: fn(&[Point]) -> Result<f64, DmsError>, points: &[Point]) -> f64 {
    match ratio(points) {
        Ok(value) => value,
        Err(e) => {
            warn!("{}", e);
            e.sentinel().unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn eye(open: f64) -> Vec<Point> {
        vec![
            Point::new(0.40, 0.50),
            Point::new(0.42, 0.50 + open),
            Point::new(0.40, 0.50),
            Point::new(0.45, 0.50),
            Point::new(0.50, 0.50),
            Point::new(0.47, 0.50 + open),
        ]
    }

    #[test]
    fn test_averages_both_eyes() {
        let landmarks = FaceLandmarks {
            left_eye: Some(eye(0.02)),
            right_eye: Some(eye(0.04)),
            outer_lips: None,
        };

        let reading = FaceAnalyzer::new().analyze(&landmarks);
        let ear = reading.eye_openness.unwrap();
        assert!((ear - 0.3).abs() < 1e-9);
        assert_eq!(reading.mouth_openness, None);
    }

    #[test]
    fn test_single_eye_is_no_information() {
        let landmarks = FaceLandmarks {
            left_eye: Some(eye(0.02)),
            ..Default::default()
        };
        assert_eq!(FaceAnalyzer::new().analyze(&landmarks).eye_openness, None);
    }

    #[test]
    fn test_short_contours_fall_back_to_sentinels() {
        let landmarks = FaceLandmarks {
            left_eye: Some(vec![Point::default(); 3]),
            right_eye: Some(vec![Point::default(); 3]),
            outer_lips: Some(vec![Point::default(); 4]),
        };

        let reading = FaceAnalyzer::new().analyze(&landmarks);
        assert_eq!(reading.eye_openness, Some(1.0));
        assert_eq!(reading.mouth_openness, Some(0.0));
    }

    #[test]
    fn test_observe_without_face() {
        let obs = FaceAnalyzer::new().observe(now(), None);
        assert!(!obs.face_present());
        assert_eq!(obs.timestamp, now());
    }
}
