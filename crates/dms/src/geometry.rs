//! Eye and mouth aspect ratios
//!
//! Both ratios are dimensionless and clamped to [0, 1]. When a contour is
//! too short the caller gets [`DmsError::InsufficientLandmarks`], whose
//! [`DmsError::sentinel`] is the conservative value to use instead: an open
//! eye or a closed mouth, so a detector glitch never escalates an alert.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detector::Point;
use crate::DmsError;

/// Horizontal spans at or below this are treated as degenerate
pub const MIN_HORIZONTAL_SPAN: f64 = 0.001;

/// Facial region a contour belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandmarkRegion {
    Eye,
    Mouth,
}

impl LandmarkRegion {
    /// Minimum number of contour points for the ratio
    pub fn required_points(self) -> usize {
        match self {
            Self::Eye => 6,
            Self::Mouth => 12,
        }
    }

    /// Value reported when the ratio cannot be computed
    pub fn sentinel(self) -> f64 {
        match self {
            Self::Eye => 1.0,
            Self::Mouth => 0.0,
        }
    }
}

impl fmt::Display for LandmarkRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eye => f.write_str("eye"),
            Self::Mouth => f.write_str("mouth"),
        }
    }
}

fn check_len(region: LandmarkRegion, points: &[Point]) -> Result<(), DmsError> {
    let required = region.required_points();
    if points.len() < required {
        return Err(DmsError::InsufficientLandmarks {
            region,
            required,
            found: points.len(),
        });
    }
    Ok(())
}

fn ratio_or(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Eye aspect ratio (EAR) of a six-point eye contour.
///
/// Two vertical lid gaps, (1, 0) and (5, 3), are averaged against the span
/// between points 2 and 4.
pub fn eye_openness(points: &[Point]) -> Result<f64, DmsError> {
    let region = LandmarkRegion::Eye;
    check_len(region, points)?;

    let vertical_1 = (points[1].y - points[0].y).abs();
    let vertical_2 = (points[5].y - points[3].y).abs();
    let horizontal = (points[2].x - points[4].x).abs();

    // NaN spans fail this comparison as well
    if horizontal.is_nan() || horizontal <= MIN_HORIZONTAL_SPAN {
        return Ok(region.sentinel());
    }

    let ear = (vertical_1 + vertical_2) / (2.0 * horizontal);
    Ok(ratio_or(ear, region.sentinel()))
}

/// Mouth aspect ratio (MAR) of an outer lip contour.
///
/// Lip gap between points 3 and 9 over the corner span between points 0 and 6.
pub fn mouth_openness(points: &[Point]) -> Result<f64, DmsError> {
    let region = LandmarkRegion::Mouth;
    check_len(region, points)?;

    let vertical = (points[3].y - points[9].y).abs();
    let horizontal = (points[0].x - points[6].x).abs();

    if horizontal.is_nan() || horizontal <= MIN_HORIZONTAL_SPAN {
        return Ok(region.sentinel());
    }

    Ok(ratio_or(vertical / horizontal, region.sentinel()))
}
