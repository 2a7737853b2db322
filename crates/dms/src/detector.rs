//! Facial landmark types and the landmark provider seam

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Normalized 2-D landmark point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Landmark contours for a single detected face.
///
/// A region is `None` when the detector could not localize it in this frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    /// Left eye contour (6 points expected)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_eye: Option<Vec<Point>>,

    /// Right eye contour (6 points expected)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_eye: Option<Vec<Point>>,

    /// Outer lip contour (12 points expected)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_lips: Option<Vec<Point>>,
}

/// External face landmark detector.
///
/// Called once per frame; returns `Ok(None)` when no face is visible. Only the
/// first face is reported, multi-face input is not supported.
pub trait LandmarkProvider<F> {
    fn detect(&mut self, frame: &F) -> Result<Option<FaceLandmarks>, DmsError>;
}

impl<F, P> LandmarkProvider<F> for &mut P
where
    P: LandmarkProvider<F> + ?Sized,
{
    fn detect(&mut self, frame: &F) -> Result<Option<FaceLandmarks>, DmsError> {
        (**self).detect(frame)
    }
}
