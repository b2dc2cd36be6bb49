pub mod board;
pub mod coordinator;
pub mod error;
pub mod router;
pub mod sink;
pub mod unit;

pub use coordinator::Coordinator;
pub use error::PlaybackError;
pub use sink::StdoutSink;

use crate::core::WorkerId;
use std::time::Duration;

/// Default number of workers (and board slots)
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Default multiplier applied to every record interval. Spreads emissions
/// far enough apart that spawn jitter between units does not reorder them.
pub const DEFAULT_PACING_SCALE_FACTOR: u32 = 30;

/// Default pause before the start barrier is released
pub const DEFAULT_START_BARRIER_GRACE: Duration = Duration::from_secs(1);

/// How a playback run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every unit finished (only reported with `return_on_completion`)
    Completed,
    /// The sum-of-intervals ceiling elapsed
    TimedOut,
    /// Cancelled from outside
    Cancelled,
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Number of workers, and size of the board
    pub worker_count: usize,
    /// Multiplier applied to each record's interval
    pub pacing_scale_factor: u32,
    /// Time given to units to reach the start barrier
    pub start_barrier_grace: Duration,
    /// Return as soon as every unit is done instead of waiting out the ceiling
    pub return_on_completion: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            pacing_scale_factor: DEFAULT_PACING_SCALE_FACTOR,
            start_barrier_grace: DEFAULT_START_BARRIER_GRACE,
            return_on_completion: false,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.worker_count == 0 {
            return Err(PlaybackError::InvalidConfig("worker count must be at least 1".to_string()));
        }
        if WorkerId::try_from(self.worker_count).is_err() {
            return Err(PlaybackError::InvalidConfig(format!(
                "worker count {} does not fit a worker id",
                self.worker_count
            )));
        }
        Ok(())
    }
}
