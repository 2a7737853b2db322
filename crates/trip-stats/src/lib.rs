//! Trip Statistics
//!
//! Aggregates per-frame alert levels and signal edges into trip records,
//! daily totals and a trip history.

mod history;
mod record;
mod session;

pub use history::{TripHistory, TripSort, TripSummary};
pub use record::{safety_rating, DailyStats, SafetyBand, TripRecord};
pub use session::{LiveCounters, SessionCounters, TripAggregator};

use thiserror::Error;

/// Session lifecycle errors; the operation that returned one changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,
    #[error("A session is already active")]
    SessionAlreadyActive,
}
