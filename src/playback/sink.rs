use crate::core::WorkerId;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Write;
#[cfg(test)]
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// One formatted playback step
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    /// Worker that emitted
    pub worker: WorkerId,
    /// Sender recorded in the destination slot at read time
    pub worker_listened: WorkerId,
    /// Text of the record being emitted
    pub message: String,
    /// Text recorded in the destination slot at read time
    pub message_listened: String,
    /// Wall-clock time of the emission
    pub emitted_at: DateTime<Utc>,
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "worker: {}", self.worker)?;
        writeln!(f, "worker_listened: {}", self.worker_listened)?;
        writeln!(f, "message: \"{}\"", self.message)?;
        writeln!(f, "message_listened: \"{}\"", self.message_listened)
    }
}

/// Destination for emissions, shared by every playback unit
pub trait EmissionSink: Send + Sync {
    fn emit(&self, emission: Emission);
}

/// Prints each emission as a block on stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EmissionSink for StdoutSink {
    fn emit(&self, emission: Emission) {
        // Whole block under one lock so units never interleave mid-block
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", emission).and_then(|_| out.flush()) {
            warn!("Failed to write emission for worker {}: {}", emission.worker, e);
        }
    }
}

/// Keeps every emission in memory, in arrival order
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    emissions: Mutex<Vec<Emission>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
impl EmissionSink for MemorySink {
    fn emit(&self, emission: Emission) {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner).push(emission);
    }
}
