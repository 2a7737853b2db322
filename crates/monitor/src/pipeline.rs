//! Per-frame fatigue pipeline
//!
//! Analyzer, tracker, alert decision and trip aggregation run as one step
//! per frame. Session start and end go through the same `&mut self`, so no
//! frame can observe a half-applied session change.

use alerting::{AlertManager, AlertRequest};
use chrono::{DateTime, Utc};
use dms::{
    AlertLevel, DmsAnalysis, DmsConfig, DmsModule, FaceLandmarks, LandmarkProvider, SignalEvent,
    SignalStates,
};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trip_stats::{
    DailyStats, LiveCounters, SessionError, TripAggregator, TripHistory, TripRecord, TripSummary,
};

use crate::settings::Settings;
use crate::MonitorError;

/// Landmark provider output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub timestamp: DateTime<Utc>,
    /// `None` when no face was detected
    #[serde(default)]
    pub face: Option<FaceLandmarks>,
}

/// Notifications published by the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    LevelChanged {
        from: AlertLevel,
        to: AlertLevel,
        at: DateTime<Utc>,
    },
    AlertTriggered {
        at: DateTime<Utc>,
        fatigue_score: f64,
        delivered: usize,
    },
    Signal(SignalEvent),
    SessionStarted {
        at: DateTime<Utc>,
    },
    TripCompleted(TripRecord),
}

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub analysis: DmsAnalysis,
    pub events: Vec<MonitorEvent>,
}

impl FrameReport {
    pub fn level(&self) -> AlertLevel {
        self.analysis.level()
    }

    pub fn alert_triggered(&self) -> bool {
        self.analysis.decision.trigger_alert
    }
}

/// Observable monitor state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub level: AlertLevel,
    pub face_present: bool,
    pub signals: SignalStates,
    pub fatigue_score: f64,
    pub last_frame: Option<DateTime<Utc>>,
    /// Present while a session runs
    pub live: Option<LiveCounters>,
    pub daily: DailyStats,
    pub trips: TripSummaryView,
}

/// Trip history figures carried in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummaryView {
    pub trip_count: usize,
    pub average_safety: f64,
    pub best_safety: f64,
}

impl Default for TripSummaryView {
    fn default() -> Self {
        Self {
            trip_count: 0,
            average_safety: 100.0,
            best_safety: 100.0,
        }
    }
}

impl From<TripSummary> for TripSummaryView {
    fn from(summary: TripSummary) -> Self {
        Self {
            trip_count: summary.trip_count,
            average_safety: summary.average_safety,
            best_safety: summary.best_safety,
        }
    }
}

/// The fatigue monitoring pipeline
pub struct MonitorPipeline {
    dms: DmsModule,
    aggregator: TripAggregator,
    alerts: AlertManager,
    level: AlertLevel,
    face_present: bool,
    fatigue_score: f64,
    last_frame: Option<DateTime<Utc>>,
    /// History summary, refreshed when a trip completes
    trips: TripSummaryView,
}

impl MonitorPipeline {
    pub fn new(dms: DmsModule, aggregator: TripAggregator, alerts: AlertManager) -> Self {
        let trips = aggregator.history().summary().into();
        Self {
            dms,
            aggregator,
            alerts,
            level: AlertLevel::Normal,
            face_present: false,
            fatigue_score: 0.0,
            last_frame: None,
            trips,
        }
    }

    /// Build a pipeline from settings, without alert sinks
    pub fn from_settings(settings: &Settings) -> Result<Self, MonitorError> {
        let dms = DmsModule::new(settings.dms.clone())?;
        let history = match settings.history.retention {
            Some(max) => TripHistory::with_retention(max),
            None => TripHistory::new(),
        };
        Ok(Self::new(
            dms,
            TripAggregator::new(history),
            AlertManager::new(settings.alerts.clone()),
        ))
    }

    /// Pipeline with default settings
    pub fn with_config(config: DmsConfig) -> Result<Self, MonitorError> {
        Self::from_settings(&Settings {
            dms: config,
            ..Default::default()
        })
    }

    pub fn alerts_mut(&mut self) -> &mut AlertManager {
        &mut self.alerts
    }

    pub fn aggregator(&self) -> &TripAggregator {
        &self.aggregator
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    /// Process one frame of provider output
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameReport {
        let analysis = self.dms.process_landmarks(frame.timestamp, frame.face.as_ref());
        self.apply(analysis)
    }

    /// Detect landmarks with `provider`, then process the frame.
    ///
    /// A provider failure skips the frame and returns `None`.
    pub fn process_with<F, P>(
        &mut self,
        provider: &mut P,
        frame: &F,
        at: DateTime<Utc>,
    ) -> Option<FrameReport>
    where
        P: LandmarkProvider<F> + ?Sized,
    {
        match self.dms.detect(provider, frame, at) {
            Ok(analysis) => Some(self.apply(analysis)),
            Err(e) => {
                warn!("Skipping frame at {}: {}", at, e);
                counter!("fatigue_frames_skipped_total").increment(1);
                None
            }
        }
    }

    fn apply(&mut self, analysis: DmsAnalysis) -> FrameReport {
        let at = analysis.observation.timestamp;
        let decision = analysis.decision;
        let mut events = Vec::new();

        counter!("fatigue_frames_total").increment(1);
        gauge!("fatigue_score").set(decision.fatigue_score);

        for event in &analysis.events {
            self.aggregator.on_signal_event(event);
            events.push(MonitorEvent::Signal(*event));
        }

        self.aggregator.on_alert_level(decision.level, decision.fatigue_score, at);

        if decision.level != self.level {
            info!("Alert level {:?} -> {:?}", self.level, decision.level);
            counter!("fatigue_level_changes_total", "level" => decision.level.short_text())
                .increment(1);
            events.push(MonitorEvent::LevelChanged {
                from: self.level,
                to: decision.level,
                at,
            });
        }

        if decision.trigger_alert {
            let delivered = self.alerts.trigger(AlertRequest {
                at,
                fatigue_score: decision.fatigue_score,
            });
            counter!("fatigue_alerts_triggered_total").increment(1);
            events.push(MonitorEvent::AlertTriggered {
                at,
                fatigue_score: decision.fatigue_score,
                delivered,
            });
        }

        self.level = decision.level;
        self.face_present = analysis.observation.face_present();
        self.fatigue_score = decision.fatigue_score;
        self.last_frame = Some(self.last_frame.map_or(at, |prev| prev.max(at)));

        FrameReport { analysis, events }
    }

    /// Start a trip session
    pub fn start_session(&mut self, at: DateTime<Utc>) -> Result<MonitorEvent, SessionError> {
        self.aggregator.start_session(at)?;
        Ok(MonitorEvent::SessionStarted { at })
    }

    /// End the trip session, returning its record
    pub fn end_session(&mut self, at: DateTime<Utc>) -> Result<TripRecord, SessionError> {
        let record = self.aggregator.end_session(at)?;
        self.trips = self.aggregator.history().summary().into();
        counter!("fatigue_trips_completed_total").increment(1);
        histogram!("fatigue_trip_safety_rating").record(record.safety_rating);
        Ok(record)
    }

    /// Reset driver signals (on driver change); trip data is kept
    pub fn reset_driver(&mut self) {
        debug!("Resetting driver state");
        self.dms.reset_state();
        self.level = AlertLevel::Normal;
        self.fatigue_score = 0.0;
    }

    pub fn reset_daily_stats(&mut self) {
        self.aggregator.reset_daily_stats();
    }

    /// Current observable state; live counters are timed by the latest frame
    pub fn snapshot(&self) -> MonitorSnapshot {
        let now = self
            .last_frame
            .or_else(|| self.aggregator.session().map(|s| s.start_time))
            .unwrap_or_else(Utc::now);

        MonitorSnapshot {
            level: self.level,
            face_present: self.face_present,
            signals: *self.dms.signals(),
            fatigue_score: self.fatigue_score,
            last_frame: self.last_frame,
            live: self.aggregator.live(now),
            daily: self.aggregator.daily_stats().clone(),
            trips: self.trips.clone(),
        }
    }
}
