use crate::core::WorkerId;
use thiserror::Error;

/// Failures raised by the playback engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// A board slot was addressed with an id outside `1..=worker_count`
    #[error("worker {worker} has no board slot (worker count is {worker_count})")]
    UnknownWorker { worker: WorkerId, worker_count: usize },

    /// A record in a worker's timeline points at a destination with no board slot
    #[error(
        "worker {worker}, record #{index}: destination worker {destination} \
         is outside 1..={worker_count} (message {message:?})"
    )]
    InvalidDestination {
        worker: WorkerId,
        index: usize,
        destination: WorkerId,
        worker_count: usize,
        message: String,
    },

    /// A playback unit's task panicked or was torn down unexpectedly
    #[error("playback unit stopped abnormally: {0}")]
    UnitAborted(String),

    #[error("invalid playback configuration: {0}")]
    InvalidConfig(String),
}
