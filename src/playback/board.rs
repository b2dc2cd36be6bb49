use crate::core::WorkerId;
use crate::playback::PlaybackError;
use std::sync::{PoisonError, RwLock};

/// Last message seen for one board slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardEntry {
    /// Id recorded as sender on the last write, 0 if never written
    pub last_sender: WorkerId,

    /// Text of the last write, empty if never written
    pub last_message: String,
}

impl BoardEntry {
    pub fn new(last_sender: WorkerId, last_message: &str) -> Self {
        Self {
            last_sender,
            last_message: last_message.to_string(),
        }
    }
}

/// Shared last-message board, one independently locked slot per worker.
///
/// Slots are indexed by `worker - 1`. Writes overwrite; nothing is queued
/// and nothing is ever removed.
#[derive(Debug)]
pub struct LastMessageBoard {
    slots: Vec<RwLock<BoardEntry>>,
}

impl LastMessageBoard {
    /// Create a zeroed board with one slot per worker
    pub fn new(worker_count: usize) -> Self {
        Self {
            slots: (0..worker_count).map(|_| RwLock::new(BoardEntry::default())).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Read the current entry of a slot
    pub fn read(&self, worker: WorkerId) -> Result<BoardEntry, PlaybackError> {
        let slot = self.slot(worker)?;
        // An entry is replaced whole under the lock, so a poisoned slot still holds a valid value
        let entry = slot.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entry.clone())
    }

    /// Replace the entry of a slot
    pub fn write(&self, worker: WorkerId, entry: BoardEntry) -> Result<(), PlaybackError> {
        let slot = self.slot(worker)?;
        *slot.write().unwrap_or_else(PoisonError::into_inner) = entry;
        Ok(())
    }

    /// Copy of every slot, in worker order
    pub fn snapshot(&self) -> Vec<BoardEntry> {
        self.slots
            .iter()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    /// Whether `worker` addresses a slot on this board
    pub fn contains(&self, worker: WorkerId) -> bool {
        self.index(worker).is_some()
    }

    fn index(&self, worker: WorkerId) -> Option<usize> {
        let index = usize::try_from(worker).ok()?.checked_sub(1)?;
        (index < self.slots.len()).then_some(index)
    }

    fn slot(&self, worker: WorkerId) -> Result<&RwLock<BoardEntry>, PlaybackError> {
        let index = self.index(worker).ok_or(PlaybackError::UnknownWorker {
            worker,
            worker_count: self.slots.len(),
        })?;
        Ok(&self.slots[index])
    }
}
