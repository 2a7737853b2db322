//! Finalized trip records and daily aggregates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const WARNING_PENALTY: f64 = 2.0;
const DANGER_PENALTY: f64 = 5.0;
const FATIGUE_PENALTY: f64 = 20.0;

/// Safety rating in [0, 100] for a trip's alert counts and average fatigue
pub fn safety_rating(warnings: u32, dangers: u32, average_fatigue: f64) -> f64 {
    let penalty = warnings as f64 * WARNING_PENALTY
        + dangers as f64 * DANGER_PENALTY
        + average_fatigue * FATIGUE_PENALTY;
    let rating = 100.0 - penalty;
    if rating.is_nan() {
        0.0
    } else {
        rating.clamp(0.0, 100.0)
    }
}

/// Coarse classification of a safety rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyBand {
    Good,
    Fair,
    Poor,
}

impl SafetyBand {
    pub fn from_rating(rating: f64) -> Self {
        if rating >= 80.0 {
            Self::Good
        } else if rating >= 60.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Summary of one completed monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds between start and end
    pub duration_secs: f64,
    pub max_fatigue_score: f64,
    pub average_fatigue_score: f64,
    /// Entries into the warning level
    pub warning_count: u32,
    /// Entries into the danger level
    pub danger_count: u32,
    pub total_blinks: u32,
    pub total_yawns: u32,
    pub safety_rating: f64,
}

impl TripRecord {
    pub fn safety_band(&self) -> SafetyBand {
        SafetyBand::from_rating(self.safety_rating)
    }
}

/// Running totals across the trips completed today
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Seconds
    pub total_driving_time: f64,
    pub total_warnings: u32,
    pub total_danger_alerts: u32,
    pub total_blinks: u32,
    pub total_yawns: u32,
    /// Mean of the per-trip average fatigue scores
    pub average_fatigue_score: f64,
    pub trips_completed: u32,
}

impl DailyStats {
    /// Fold a completed trip into the totals
    pub fn record_trip(&mut self, trip: &TripRecord) {
        let previous = self.trips_completed as f64;

        self.total_driving_time += trip.duration_secs;
        self.total_warnings += trip.warning_count;
        self.total_danger_alerts += trip.danger_count;
        self.total_blinks += trip.total_blinks;
        self.total_yawns += trip.total_yawns;
        self.trips_completed += 1;
        self.average_fatigue_score = (self.average_fatigue_score * previous
            + trip.average_fatigue_score)
            / self.trips_completed as f64;
    }

    /// Per-trip penalty averaged over the day; 100 with no trips
    pub fn safety_score(&self) -> f64 {
        if self.trips_completed == 0 {
            return 100.0;
        }
        let penalty = self.total_warnings as f64 * WARNING_PENALTY
            + self.total_danger_alerts as f64 * DANGER_PENALTY
            + self.average_fatigue_score * FATIGUE_PENALTY;
        (100.0 - penalty / self.trips_completed as f64).max(0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trip(duration_secs: f64, avg_fatigue: f64) -> TripRecord {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        TripRecord {
            id: Uuid::new_v4(),
            start_time: start,
            end_time: start + chrono::Duration::seconds(duration_secs as i64),
            duration_secs,
            max_fatigue_score: avg_fatigue,
            average_fatigue_score: avg_fatigue,
            warning_count: 1,
            danger_count: 1,
            total_blinks: 10,
            total_yawns: 2,
            safety_rating: safety_rating(1, 1, avg_fatigue),
        }
    }

    #[test]
    fn test_safety_rating() {
        assert!((safety_rating(2, 1, 0.3) - 85.0).abs() < 1e-9);
        assert_eq!(safety_rating(0, 0, 0.0), 100.0);
        assert_eq!(safety_rating(40, 10, 1.0), 0.0);
    }

    #[test]
    fn test_bands() {
        assert_eq!(SafetyBand::from_rating(85.0), SafetyBand::Good);
        assert_eq!(SafetyBand::from_rating(60.0), SafetyBand::Fair);
        assert_eq!(SafetyBand::from_rating(10.0), SafetyBand::Poor);
    }

    #[test]
    fn test_daily_fold() {
        let mut daily = DailyStats::default();
        daily.record_trip(&trip(600.0, 0.2));
        daily.record_trip(&trip(300.0, 0.4));

        assert_eq!(daily.trips_completed, 2);
        assert_eq!(daily.total_driving_time, 900.0);
        assert_eq!(daily.total_warnings, 2);
        assert_eq!(daily.total_danger_alerts, 2);
        assert_eq!(daily.total_blinks, 20);
        assert_eq!(daily.total_yawns, 4);
        assert!((daily.average_fatigue_score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_daily_safety_score() {
        let mut daily = DailyStats::default();
        assert_eq!(daily.safety_score(), 100.0);

        daily.record_trip(&trip(600.0, 0.0));
        // (2 + 5) / 1 trip
        assert!((daily.safety_score() - 93.0).abs() < 1e-9);

        daily.reset();
        assert_eq!(daily, DailyStats::default());
    }
}
