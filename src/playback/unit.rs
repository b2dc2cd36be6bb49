use crate::core::WorkerId;
use crate::playback::board::{BoardEntry, LastMessageBoard};
use crate::playback::router::WorkerTimeline;
use crate::playback::sink::{Emission, EmissionSink};
use crate::playback::PlaybackError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Barrier;
use tracing::{debug, info_span, trace, Instrument};

/// Replays one worker's timeline against the shared board
pub struct PlaybackUnit {
    worker: WorkerId,
    timeline: WorkerTimeline,
    board: Arc<LastMessageBoard>,
    sink: Arc<dyn EmissionSink>,
    pacing_scale_factor: u32,
}

impl PlaybackUnit {
    pub fn new(
        worker: WorkerId,
        timeline: WorkerTimeline,
        board: Arc<LastMessageBoard>,
        sink: Arc<dyn EmissionSink>,
        pacing_scale_factor: u32,
    ) -> Self {
        Self {
            worker,
            timeline,
            board,
            sink,
            pacing_scale_factor,
        }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Wait at the start barrier, then emit every record in order.
    ///
    /// Fails on the first record whose destination has no board slot; the
    /// records before it have already been emitted.
    pub async fn run(self, start: Arc<Barrier>) -> Result<(), PlaybackError> {
        let span = info_span!("unit", worker = self.worker);
        self.play(start).instrument(span).await
    }

    async fn play(self, start: Arc<Barrier>) -> Result<(), PlaybackError> {
        trace!("Waiting at start barrier");
        start.wait().await;
        debug!("Released, {} records to play", self.timeline.len());

        for (index, record) in self.timeline.iter().enumerate() {
            let destination = record.destination_worker;
            if !self.board.contains(destination) {
                return Err(PlaybackError::InvalidDestination {
                    worker: self.worker,
                    index,
                    destination,
                    worker_count: self.board.len(),
                    message: record.message.clone(),
                });
            }

            let emitted_at = Utc::now();
            let listened = self.board.read(destination)?;
            self.sink.emit(Emission {
                worker: self.worker,
                worker_listened: listened.last_sender,
                message: record.message.clone(),
                message_listened: listened.last_message,
                emitted_at,
            });

            // The slot records its own id as sender, not the emitting worker
            self.board.write(destination, BoardEntry::new(destination, &record.message))?;

            let pause = record.scaled_interval(self.pacing_scale_factor);
            trace!("Record #{} -> worker {}, pausing {:?}", index, destination, pause);
            tokio::time::sleep(pause).await;
        }

        debug!("Timeline finished");
        Ok(())
    }
}
