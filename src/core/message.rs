use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker identity. Valid ids are `1..=worker_count`; 0 means "nobody".
/// Ids outside that range, negatives included, decode fine and are
/// rejected when used as a board slot.
pub type WorkerId = i64;

/// A single recorded message between two workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Worker that sent the message
    pub worker: WorkerId,

    /// Worker the message is addressed to
    pub destination_worker: WorkerId,

    /// Pause after this message, in milliseconds (before scaling)
    pub interval: u64,

    /// Message text
    pub message: String,
}

impl MessageRecord {
    pub fn new(
        worker: WorkerId,
        destination_worker: WorkerId,
        interval: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            worker,
            destination_worker,
            interval,
            message: message.into(),
        }
    }

    /// Pause after this message with the pacing factor applied
    pub fn scaled_interval(&self, scale: u32) -> Duration {
        Duration::from_millis(self.interval.saturating_mul(u64::from(scale)))
    }
}
