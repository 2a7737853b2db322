//! Monitor service
//!
//! Owns the pipeline on a single task. Frames and session commands are
//! applied in submission order; observers read published snapshots and
//! never touch pipeline state.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use trip_stats::{SessionError, TripRecord};

use crate::pipeline::{LandmarkFrame, MonitorEvent, MonitorPipeline, MonitorSnapshot};
use crate::MonitorError;

/// Event fan-out buffer; lagging subscribers lose the oldest events
const EVENT_BUFFER: usize = 256;

enum Command {
    Frame(LandmarkFrame),
    StartSession {
        at: DateTime<Utc>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    EndSession {
        at: DateTime<Utc>,
        reply: oneshot::Sender<Result<TripRecord, SessionError>>,
    },
    ResetDriver,
    ResetDailyStats,
    Shutdown,
}

/// Single-writer loop around a [`MonitorPipeline`]
pub struct MonitorService {
    receiver: mpsc::Receiver<Command>,
    pipeline: MonitorPipeline,
    state: watch::Sender<MonitorSnapshot>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorService {
    /// Spawn the service loop; the join handle yields the pipeline on shutdown
    pub fn spawn(
        pipeline: MonitorPipeline,
        capacity: usize,
    ) -> (MonitorHandle, JoinHandle<MonitorPipeline>) {
        info!("Starting monitor service: queue capacity={}", capacity);
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(pipeline.snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);

        let handle = MonitorHandle {
            sender: tx,
            state: state_rx,
            events: events_tx.clone(),
        };

        let service = Self {
            receiver: rx,
            pipeline,
            state: state_tx,
            events: events_tx,
        };

        (handle, tokio::spawn(service.run()))
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) -> MonitorPipeline {
        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::Frame(frame) => {
                    let report = self.pipeline.process_frame(&frame);
                    self.publish(report.events);
                    self.publish_state();
                }
                Command::StartSession { at, reply } => {
                    let result = match self.pipeline.start_session(at) {
                        Ok(event) => {
                            self.publish(vec![event]);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    };
                    self.publish_state();
                    let _ = reply.send(result);
                }
                Command::EndSession { at, reply } => {
                    let result = self.pipeline.end_session(at);
                    if let Ok(record) = &result {
                        self.publish(vec![MonitorEvent::TripCompleted(record.clone())]);
                    }
                    // Callers may read the snapshot as soon as the reply lands
                    self.publish_state();
                    let _ = reply.send(result);
                }
                Command::ResetDriver => {
                    self.pipeline.reset_driver();
                    self.publish_state();
                }
                Command::ResetDailyStats => {
                    self.pipeline.reset_daily_stats();
                    self.publish_state();
                }
                Command::Shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        info!("Monitor service stopped");
        self.pipeline
    }

    fn publish_state(&self) {
        self.state.send_replace(self.pipeline.snapshot());
    }

    fn publish(&self, events: Vec<MonitorEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

/// Cloneable client of a running [`MonitorService`]
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<Command>,
    state: watch::Receiver<MonitorSnapshot>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorHandle {
    /// Queue a frame, waiting while the queue is full
    pub async fn submit(&self, frame: LandmarkFrame) -> Result<(), MonitorError> {
        self.send(Command::Frame(frame)).await
    }

    pub async fn start_session(&self, at: DateTime<Utc>) -> Result<(), MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::StartSession { at, reply }).await?;
        Ok(rx.await.map_err(|_| MonitorError::ChannelClosed)??)
    }

    /// End the session once every frame queued before it is processed
    pub async fn end_session(&self, at: DateTime<Utc>) -> Result<TripRecord, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::EndSession { at, reply }).await?;
        Ok(rx.await.map_err(|_| MonitorError::ChannelClosed)??)
    }

    pub async fn reset_driver(&self) -> Result<(), MonitorError> {
        self.send(Command::ResetDriver).await
    }

    pub async fn reset_daily_stats(&self) -> Result<(), MonitorError> {
        self.send(Command::ResetDailyStats).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MonitorSnapshot> {
        self.state.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), MonitorError> {
        self.sender.send(command).await.map_err(|_| MonitorError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use dms::{AlertLevel, DmsConfig, FaceLandmarks, Point};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn frame(ms: i64, eye_gap: f64) -> LandmarkFrame {
        let eye = vec![
            Point::new(0.40, 0.50),
            Point::new(0.42, 0.50 + eye_gap),
            Point::new(0.40, 0.50),
            Point::new(0.45, 0.50),
            Point::new(0.50, 0.50),
            Point::new(0.47, 0.50 + eye_gap),
        ];
        LandmarkFrame {
            timestamp: t(ms),
            face: Some(FaceLandmarks {
                left_eye: Some(eye.clone()),
                right_eye: Some(eye),
                outer_lips: None,
            }),
        }
    }

    fn spawn() -> (MonitorHandle, JoinHandle<MonitorPipeline>) {
        let pipeline = MonitorPipeline::with_config(DmsConfig::default()).unwrap();
        MonitorService::spawn(pipeline, 8)
    }

    #[tokio::test]
    async fn test_frames_apply_in_order() {
        let (handle, _task) = spawn();
        handle.start_session(t(0)).await.unwrap();

        for step in 0..=21 {
            handle.submit(frame(step * 100, 0.01)).await.unwrap();
        }
        handle.submit(frame(2200, 0.03)).await.unwrap();

        let trip = handle.end_session(t(60_000)).await.unwrap();
        assert_eq!(trip.warning_count, 1);
        assert_eq!(trip.danger_count, 1);
        assert_eq!(trip.total_blinks, 1);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.level, AlertLevel::Normal);
        assert_eq!(snapshot.daily.trips_completed, 1);
        assert!(snapshot.live.is_none());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (handle, _task) = spawn();
        let mut events = handle.subscribe_events();

        handle.start_session(t(0)).await.unwrap();
        for step in 0..=20 {
            handle.submit(frame(step * 100, 0.01)).await.unwrap();
        }
        handle.end_session(t(3000)).await.unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }

        assert!(matches!(received.first(), Some(MonitorEvent::SessionStarted { .. })));
        assert!(received
            .iter()
            .any(|e| matches!(e, MonitorEvent::LevelChanged { to: AlertLevel::Danger, .. })));
        assert_eq!(
            received
                .iter()
                .filter(|e| matches!(e, MonitorEvent::AlertTriggered { .. }))
                .count(),
            1
        );
        assert!(matches!(received.last(), Some(MonitorEvent::TripCompleted(_))));
    }

    #[tokio::test]
    async fn test_state_watch_sees_updates() {
        let (handle, _task) = spawn();
        let mut state = handle.subscribe_state();
        assert_eq!(state.borrow().level, AlertLevel::Normal);

        handle.submit(frame(0, 0.01)).await.unwrap();
        state.changed().await.unwrap();
        assert_eq!(state.borrow().level, AlertLevel::Warning);
        assert_eq!(state.borrow().last_frame, Some(t(0)));
    }

    #[tokio::test]
    async fn test_session_errors_propagate() {
        let (handle, _task) = spawn();
        let result = handle.end_session(t(0)).await;
        assert!(matches!(
            result,
            Err(MonitorError::Session(SessionError::NoActiveSession))
        ));

        handle.start_session(t(0)).await.unwrap();
        let result = handle.start_session(t(100)).await;
        assert!(matches!(
            result,
            Err(MonitorError::Session(SessionError::SessionAlreadyActive))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_returns_pipeline() {
        let (handle, task) = spawn();
        handle.submit(frame(0, 0.01)).await.unwrap();
        handle.shutdown().await.unwrap();

        let pipeline = task.await.unwrap();
        assert_eq!(pipeline.level(), AlertLevel::Warning);
        assert!(matches!(
            handle.submit(frame(100, 0.01)).await,
            Err(MonitorError::ChannelClosed)
        ));
    }
}
