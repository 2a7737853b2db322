//! Driver Monitoring System (DMS)
//!
//! Fatigue detection from facial landmarks:
//! - Eye and mouth aspect ratios
//! - Eyes-closed, yawning and face-absent signal tracking
//! - Normal / Warning / Danger alert decision
//! - Fatigue score

pub mod analysis;
pub mod config;
pub mod decision;
pub mod detector;
pub mod geometry;
pub mod state;
pub mod tracker;

pub use analysis::{DmsAnalysis, FaceAnalyzer, FaceReading, FrameObservation};
pub use config::{DmsConfig, Thresholds};
pub use decision::{AlertDecision, AlertLevel, AlertPolicy, FatigueBand, ThresholdPolicy};
pub use detector::{FaceLandmarks, LandmarkProvider, Point};
pub use geometry::LandmarkRegion;
pub use state::{Signal, SignalEdge, SignalEvent, SignalState, SignalStates};
pub use tracker::SignalTracker;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Insufficient {region} landmarks: need {required}, got {found}")]
    InsufficientLandmarks {
        region: LandmarkRegion,
        required: usize,
        found: usize,
    },

    #[error("Landmark detection failed: {0}")]
    Detector(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DmsError {
    /// Conservative ratio to use in place of a failed measurement
    pub fn sentinel(&self) -> Option<f64> {
        match self {
            Self::InsufficientLandmarks { region, .. } => Some(region.sentinel()),
            _ => None,
        }
    }
}

/// Driver monitoring module: analyzer, tracker and alert decision in one
/// per-frame step
pub struct DmsModule {
    config: DmsConfig,
    analyzer: FaceAnalyzer,
    tracker: SignalTracker,
    policy: Box<dyn AlertPolicy>,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        let policy = ThresholdPolicy::new(config.thresholds());
        Self::with_policy(config, Box::new(policy))
    }

    /// Create a DMS module with a custom alert policy
    pub fn with_policy(config: DmsConfig, policy: Box<dyn AlertPolicy>) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "Creating DMS module: sensitivity={}, thresholds={:?}",
            config.alert_sensitivity,
            config.thresholds()
        );

        Ok(Self {
            analyzer: FaceAnalyzer::new(),
            tracker: SignalTracker::new(config.thresholds()),
            policy,
            config,
        })
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Current signal states
    pub fn signals(&self) -> &SignalStates {
        self.tracker.states()
    }

    /// Analyze landmarks reported for one frame (`None` = no face)
    pub fn process_landmarks(
        &mut self,
        timestamp: DateTime<Utc>,
        face: Option<&FaceLandmarks>,
    ) -> DmsAnalysis {
        let observation = self.analyzer.observe(timestamp, face);
        self.process(observation)
    }

    /// Run a frame through a landmark provider, then analyze it.
    ///
    /// Provider failures leave all state untouched.
    pub fn detect<F, P>(
        &mut self,
        provider: &mut P,
        frame: &F,
        timestamp: DateTime<Utc>,
    ) -> Result<DmsAnalysis, DmsError>
    where
        P: LandmarkProvider<F> + ?Sized,
    {
        let face = provider.detect(frame)?;
        Ok(self.process_landmarks(timestamp, face.as_ref()))
    }

    /// Fold an analyzed frame into the signals and decide the alert level
    pub fn process(&mut self, observation: FrameObservation) -> DmsAnalysis {
        let events = self.tracker.update(&observation);
        let signals = *self.tracker.states();
        let decision = self.policy.decide(&signals);

        DmsAnalysis {
            observation,
            signals,
            events,
            decision,
        }
    }

    /// Reset driver state (on driver change)
    pub fn reset_state(&mut self) {
        self.tracker.reset();
    }
}
