//! Trip history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::record::TripRecord;

/// Number of trips compared at each end of the history for the improvement trend
const TREND_WINDOW: usize = 3;

/// Display orderings for the trip list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripSort {
    /// Latest start first
    #[default]
    Recent,
    /// Longest first
    Duration,
    /// Highest safety rating first
    Safety,
}

/// Aggregate view over the stored trips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_count: usize,
    /// Seconds
    pub total_duration: f64,
    pub average_safety: f64,
    pub best_safety: f64,
    /// Mean rating of the latest trips minus that of the earliest ones
    pub improvement: f64,
}

/// Completed trips in completion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripHistory {
    trips: VecDeque<TripRecord>,
    /// Oldest trips are evicted past this many; unbounded when `None`
    retention: Option<usize>,
}

impl TripHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `max_trips` records
    pub fn with_retention(max_trips: usize) -> Self {
        Self {
            trips: VecDeque::new(),
            retention: Some(max_trips.max(1)),
        }
    }

    /// Append a completed trip, enforcing retention
    pub fn push(&mut self, trip: TripRecord) {
        if let Some(max) = self.retention {
            while self.trips.len() >= max {
                if let Some(evicted) = self.trips.pop_front() {
                    debug!("Evicting trip {} from history", evicted.id);
                }
            }
        }
        self.trips.push_back(trip);
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Trips in completion order
    pub fn iter(&self) -> impl Iterator<Item = &TripRecord> {
        self.trips.iter()
    }

    pub fn latest(&self) -> Option<&TripRecord> {
        self.trips.back()
    }

    /// Copy of the trips in the requested order
    pub fn sorted(&self, sort: TripSort) -> Vec<TripRecord> {
        let mut trips: Vec<TripRecord> = self.trips.iter().cloned().collect();
        match sort {
            TripSort::Recent => trips.sort_by(|a, b| b.start_time.cmp(&a.start_time)),
            TripSort::Duration => trips.sort_by(|a, b| b.duration_secs.total_cmp(&a.duration_secs)),
            TripSort::Safety => trips.sort_by(|a, b| b.safety_rating.total_cmp(&a.safety_rating)),
        }
        trips
    }

    pub fn summary(&self) -> TripSummary {
        let ratings: Vec<f64> = self.trips.iter().map(|t| t.safety_rating).collect();

        let average_safety = mean(&ratings).unwrap_or(100.0);
        let best_safety = ratings.iter().copied().reduce(f64::max).unwrap_or(100.0);

        let improvement = if ratings.len() >= 2 {
            let head = &ratings[..ratings.len().min(TREND_WINDOW)];
            let tail = &ratings[ratings.len().saturating_sub(TREND_WINDOW)..];
            mean(tail).unwrap_or(0.0) - mean(head).unwrap_or(0.0)
        } else {
            0.0
        };

        TripSummary {
            trip_count: self.trips.len(),
            total_duration: self.trips.iter().map(|t| t.duration_secs).sum(),
            average_safety,
            best_safety,
            improvement,
        }
    }

    pub fn clear(&mut self) {
        self.trips.clear();
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
