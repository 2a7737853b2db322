//! Session aggregation

use chrono::{DateTime, Utc};
use dms::{AlertLevel, SignalEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::history::TripHistory;
use crate::record::{safety_rating, DailyStats, TripRecord};
use crate::SessionError;

/// In-progress trip accumulators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub start_time: DateTime<Utc>,
    pub warning_transitions: u32,
    pub danger_transitions: u32,
    pub total_blinks: u32,
    pub total_yawns: u32,
    pub max_fatigue_score: f64,
    pub fatigue_score_sum: f64,
    pub fatigue_score_count: u64,
    /// Level seen on the previous frame, for entry detection
    pub last_level: AlertLevel,
    pub last_fatigue_score: f64,
}

impl SessionCounters {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            warning_transitions: 0,
            danger_transitions: 0,
            total_blinks: 0,
            total_yawns: 0,
            max_fatigue_score: 0.0,
            fatigue_score_sum: 0.0,
            fatigue_score_count: 0,
            last_level: AlertLevel::Normal,
            last_fatigue_score: 0.0,
        }
    }

    pub fn average_fatigue_score(&self) -> f64 {
        if self.fatigue_score_count == 0 {
            0.0
        } else {
            self.fatigue_score_sum / self.fatigue_score_count as f64
        }
    }

    /// Seconds since the session started
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let micros = (now - self.start_time).num_microseconds().unwrap_or(i64::MAX);
        micros.max(0) as f64 / 1_000_000.0
    }
}

/// Live values for display while a session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveCounters {
    pub level: AlertLevel,
    pub total_blinks: u32,
    pub total_yawns: u32,
    pub fatigue_score: f64,
    pub session_duration_secs: f64,
}

/// Turns per-frame alert levels and signal edges into trip statistics
#[derive(Debug, Clone, Default)]
pub struct TripAggregator {
    session: Option<SessionCounters>,
    history: TripHistory,
    daily: DailyStats,
}

impl TripAggregator {
    pub fn new(history: TripHistory) -> Self {
        Self {
            session: None,
            history,
            daily: DailyStats::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&SessionCounters> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &TripHistory {
        &self.history
    }

    pub fn daily_stats(&self) -> &DailyStats {
        &self.daily
    }

    /// Begin a session; an already running session is left untouched
    pub fn start_session(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if let Some(session) = &self.session {
            debug!("Session already active since {}", session.start_time);
            return Err(SessionError::SessionAlreadyActive);
        }

        info!("Trip session started at {}", now);
        self.session = Some(SessionCounters::new(now));
        Ok(())
    }

    /// Record the level computed for a frame.
    ///
    /// Warning and danger are counted on entry only, not per frame.
    pub fn on_alert_level(&mut self, level: AlertLevel, fatigue_score: f64, _now: DateTime<Utc>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if level != session.last_level {
            match level {
                AlertLevel::Warning => session.warning_transitions += 1,
                AlertLevel::Danger => session.danger_transitions += 1,
                AlertLevel::Normal => {}
            }
            session.last_level = level;
        }

        let score = if fatigue_score.is_nan() {
            0.0
        } else {
            fatigue_score.clamp(0.0, 1.0)
        };
        session.max_fatigue_score = session.max_fatigue_score.max(score);
        session.fatigue_score_sum += score;
        session.fatigue_score_count += 1;
        session.last_fatigue_score = score;
    }

    /// Count completed blinks and yawns among a frame's signal edges
    pub fn on_signal_event(&mut self, event: &SignalEvent) {
        if event.is_blink() {
            self.on_blink_completed();
        } else if event.is_yawn() {
            self.on_yawn_completed();
        }
    }

    pub fn on_blink_completed(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.total_blinks += 1;
        }
    }

    pub fn on_yawn_completed(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.total_yawns += 1;
        }
    }

    /// Finish the session, returning its trip record.
    ///
    /// The record is appended to the history and folded into the daily stats.
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Result<TripRecord, SessionError> {
        let session = self.session.take().ok_or(SessionError::NoActiveSession)?;

        let average = session.average_fatigue_score();
        let record = TripRecord {
            id: Uuid::new_v4(),
            start_time: session.start_time,
            end_time: now,
            duration_secs: session.elapsed_secs(now),
            max_fatigue_score: session.max_fatigue_score,
            average_fatigue_score: average,
            warning_count: session.warning_transitions,
            danger_count: session.danger_transitions,
            total_blinks: session.total_blinks,
            total_yawns: session.total_yawns,
            safety_rating: safety_rating(
                session.warning_transitions,
                session.danger_transitions,
                average,
            ),
        };

        info!(
            "Trip {} finished: {:.0}s, rating {:.1}, warnings {}, dangers {}",
            record.id,
            record.duration_secs,
            record.safety_rating,
            record.warning_count,
            record.danger_count
        );

        self.daily.record_trip(&record);
        self.history.push(record.clone());
        Ok(record)
    }

    /// Live values for the running session
    pub fn live(&self, now: DateTime<Utc>) -> Option<LiveCounters> {
        self.session.as_ref().map(|s| LiveCounters {
            level: s.last_level,
            total_blinks: s.total_blinks,
            total_yawns: s.total_yawns,
            fatigue_score: s.last_fatigue_score,
            session_duration_secs: s.elapsed_secs(now),
        })
    }

    /// Explicit reset of the day's totals
    pub fn reset_daily_stats(&mut self) {
        info!("Resetting daily stats");
        self.daily.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use dms::{Signal, SignalEdge};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn exited(signal: Signal) -> SignalEvent {
        SignalEvent {
            signal,
            edge: SignalEdge::Exited { duration_secs: 0.4 },
            at: t(1),
        }
    }

    #[test]
    fn test_rating_from_transitions() {
        let mut agg = TripAggregator::default();
        agg.start_session(t(0)).unwrap();

        for level in [
            AlertLevel::Normal,
            AlertLevel::Warning,
            AlertLevel::Warning,
            AlertLevel::Normal,
            AlertLevel::Warning,
            AlertLevel::Danger,
        ] {
            agg.on_alert_level(level, 0.3, t(1));
        }

        let trip = agg.end_session(t(600)).unwrap();
        assert_eq!(trip.warning_count, 2);
        assert_eq!(trip.danger_count, 1);
        assert_eq!(trip.duration_secs, 600.0);
        assert!((trip.average_fatigue_score - 0.3).abs() < 1e-9);
        assert!((trip.safety_rating - 85.0).abs() < 1e-9);

        let daily = agg.daily_stats();
        assert_eq!(daily.trips_completed, 1);
        assert_eq!(daily.total_driving_time, 600.0);
        assert_eq!(agg.history().len(), 1);
        assert!(!agg.is_active());
    }

    #[test]
    fn test_end_without_session_is_noop() {
        let mut agg = TripAggregator::default();
        assert_eq!(agg.end_session(t(10)), Err(SessionError::NoActiveSession));
        assert!(agg.history().is_empty());
        assert_eq!(*agg.daily_stats(), DailyStats::default());
    }

    #[test]
    fn test_double_start_keeps_counters() {
        let mut agg = TripAggregator::default();
        agg.start_session(t(0)).unwrap();
        agg.on_alert_level(AlertLevel::Warning, 0.5, t(1));
        agg.on_blink_completed();

        assert_eq!(
            agg.start_session(t(5)),
            Err(SessionError::SessionAlreadyActive)
        );

        let session = agg.session().unwrap();
        assert_eq!(session.start_time, t(0));
        assert_eq!(session.warning_transitions, 1);
        assert_eq!(session.total_blinks, 1);
    }

    #[test]
    fn test_blinks_and_yawns() {
        let mut agg = TripAggregator::default();
        agg.start_session(t(0)).unwrap();

        agg.on_signal_event(&exited(Signal::EyesClosed));
        agg.on_signal_event(&exited(Signal::EyesClosed));
        agg.on_signal_event(&exited(Signal::Yawning));
        agg.on_signal_event(&exited(Signal::FaceAbsent));
        agg.on_signal_event(&SignalEvent {
            signal: Signal::EyesClosed,
            edge: SignalEdge::Entered,
            at: t(2),
        });

        let live = agg.live(t(30)).unwrap();
        assert_eq!(live.total_blinks, 2);
        assert_eq!(live.total_yawns, 1);
        assert_eq!(live.session_duration_secs, 30.0);

        let trip = agg.end_session(t(60)).unwrap();
        assert_eq!(trip.total_blinks, 2);
        assert_eq!(agg.daily_stats().total_yawns, 1);
    }

    #[test]
    fn test_events_ignored_without_session() {
        let mut agg = TripAggregator::default();
        agg.on_alert_level(AlertLevel::Danger, 1.0, t(0));
        agg.on_blink_completed();
        assert!(agg.live(t(0)).is_none());

        agg.start_session(t(1)).unwrap();
        let session = agg.session().unwrap();
        assert_eq!(session.danger_transitions, 0);
        assert_eq!(session.total_blinks, 0);
    }

    #[test]
    fn test_max_fatigue_tracked() {
        let mut agg = TripAggregator::default();
        agg.start_session(t(0)).unwrap();
        for score in [0.1, 0.7, 0.2] {
            agg.on_alert_level(AlertLevel::Normal, score, t(1));
        }
        let trip = agg.end_session(t(10)).unwrap();
        assert_eq!(trip.max_fatigue_score, 0.7);
        assert_eq!(trip.warning_count, 0);
        assert_eq!(
            trip.safety_rating,
            100.0 - trip.average_fatigue_score * 20.0
        );
    }

    #[test]
    fn test_empty_session_rates_perfect() {
        let mut agg = TripAggregator::default();
        agg.start_session(t(0)).unwrap();
        let trip = agg.end_session(t(0)).unwrap();
        assert_eq!(trip.safety_rating, 100.0);
        assert_eq!(trip.duration_secs, 0.0);
    }

    #[test]
    fn test_reset_daily_stats() {
        let mut agg = TripAggregator::default();
        agg.start_session(t(0)).unwrap();
        agg.end_session(t(100)).unwrap();
        agg.reset_daily_stats();
        assert_eq!(agg.daily_stats().trips_completed, 0);
        assert_eq!(agg.history().len(), 1);
    }
}
