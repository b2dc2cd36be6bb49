use crate::core::MessageRecord;
use crate::playback::board::LastMessageBoard;
use crate::playback::router::{route, total_interval};
use crate::playback::sink::EmissionSink;
use crate::playback::unit::PlaybackUnit;
use crate::playback::{PlaybackConfig, PlaybackError, PlaybackOutcome};
use std::sync::Arc;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runs one playback unit per worker against a shared board
pub struct Coordinator {
    config: PlaybackConfig,
    board: Arc<LastMessageBoard>,
    sink: Arc<dyn EmissionSink>,
}

impl Coordinator {
    pub fn new(config: PlaybackConfig, sink: Arc<dyn EmissionSink>) -> Result<Self, PlaybackError> {
        config.validate()?;
        let board = Arc::new(LastMessageBoard::new(config.worker_count));
        Ok(Self { config, board, sink })
    }

    /// The board shared by the units, for inspection after a run
    pub fn board(&self) -> &Arc<LastMessageBoard> {
        &self.board
    }

    /// Replay `records` and return once the run is over.
    ///
    /// All units are held at a start barrier until the grace period has
    /// passed. After that the run is bounded by the sum of every record's
    /// unscaled interval (scaled when `return_on_completion` is set); units
    /// still pausing when it elapses, or when `cancel` fires, are aborted.
    /// A unit failure ends the run with that error.
    pub async fn run(
        &self,
        records: &[MessageRecord],
        cancel: CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let timelines = route(records, self.config.worker_count);
        let ceiling = if self.config.return_on_completion {
            // Scaled sum bounds even a single unit that owns every record
            total_interval(records).saturating_mul(self.config.pacing_scale_factor)
        } else {
            total_interval(records)
        };

        if timelines.is_empty() {
            info!("No records to replay");
            return Ok(PlaybackOutcome::Completed);
        }

        // One party per unit plus the coordinator
        let start = Arc::new(Barrier::new(timelines.len() + 1));
        let mut units = JoinSet::new();

        for (worker, timeline) in timelines {
            debug!("Spawning unit for worker {} ({} records)", worker, timeline.len());
            let unit = PlaybackUnit::new(
                worker,
                timeline,
                self.board.clone(),
                self.sink.clone(),
                self.config.pacing_scale_factor,
            );
            let start = start.clone();
            units.spawn(async move {
                let worker = unit.worker();
                (worker, unit.run(start).await)
            });
        }

        let grace = self.config.start_barrier_grace;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancelled before start");
                units.shutdown().await;
                return Ok(PlaybackOutcome::Cancelled);
            }
            _ = async {
                tokio::time::sleep(grace).await;
                start.wait().await;
            } => {
                info!("Started {} units, ceiling {:?}", units.len(), ceiling);
            }
        }

        let deadline = tokio::time::sleep(ceiling);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break PlaybackOutcome::Cancelled,
                Some(joined) = units.join_next() => match joined {
                    Ok((worker, Ok(()))) => {
                        debug!("Unit for worker {} finished", worker);
                        if self.config.return_on_completion && units.is_empty() {
                            break PlaybackOutcome::Completed;
                        }
                    }
                    Ok((worker, Err(e))) => {
                        error!("Unit for worker {} failed: {}", worker, e);
                        units.shutdown().await;
                        return Err(e);
                    }
                    Err(e) => {
                        error!("Unit task failed: {}", e);
                        units.shutdown().await;
                        return Err(PlaybackError::UnitAborted(e.to_string()));
                    }
                },
                _ = &mut deadline => break PlaybackOutcome::TimedOut,
            }
        };

        if !units.is_empty() {
            debug!("Abandoning {} unfinished units", units.len());
        }
        units.shutdown().await;

        info!("Playback ended: {:?}", outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_json_lines;
    use crate::playback::board::BoardEntry;
    use crate::playback::sink::MemorySink;
    use std::time::Duration;
    use tokio::time::Instant;

    fn quick_config(worker_count: usize) -> PlaybackConfig {
        PlaybackConfig {
            worker_count,
            pacing_scale_factor: 1,
            start_barrier_grace: Duration::from_millis(20),
            return_on_completion: false,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_worker_scenario() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = Coordinator::new(quick_config(2), sink.clone()).unwrap();
        let records = vec![
            MessageRecord::new(1, 2, 100, "a"),
            MessageRecord::new(2, 1, 50, "b"),
        ];

        let outcome = coordinator.run(&records, CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::TimedOut);

        let emissions = sink.emissions();
        assert_eq!(emissions.len(), 2);

        let from_1 = emissions.iter().find(|e| e.worker == 1).unwrap();
        let from_2 = emissions.iter().find(|e| e.worker == 2).unwrap();
        assert_eq!(from_1.message, "a");
        assert_eq!(from_2.message, "b");

        // Each unit reads its destination slot before its own write lands there
        assert_eq!((from_1.worker_listened, from_1.message_listened.as_str()), (0, ""));
        assert_eq!((from_2.worker_listened, from_2.message_listened.as_str()), (0, ""));

        // Slots are keyed by destination and record the destination as sender
        assert_eq!(
            coordinator.board().snapshot(),
            vec![BoardEntry::new(1, "b"), BoardEntry::new(2, "a")]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_record_emitted_once_in_order() {
        let sink = Arc::new(MemorySink::new());
        let config = PlaybackConfig {
            return_on_completion: true,
            ..quick_config(3)
        };
        let coordinator = Coordinator::new(config, sink.clone()).unwrap();

        let mut records = Vec::new();
        for i in 0..6 {
            for worker in 1..=3 {
                let destination = worker % 3 + 1;
                let text = format!("w{}-{}", worker, i);
                records.push(MessageRecord::new(worker, destination, 20, text));
            }
        }

        let outcome = coordinator.run(&records, CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);

        let emissions = sink.emissions();
        assert_eq!(emissions.len(), records.len());
        for worker in 1..=3 {
            let texts: Vec<_> = emissions
                .iter()
                .filter(|e| e.worker == worker)
                .map(|e| e.message.clone())
                .collect();
            let expected: Vec<_> = (0..6).map(|i| format!("w{}-{}", worker, i)).collect();
            assert_eq!(texts, expected);
        }

        // Each slot ends with the last message addressed to it
        let board = coordinator.board().snapshot();
        assert_eq!(board[0], BoardEntry::new(1, "w3-5"));
        assert_eq!(board[1], BoardEntry::new(2, "w1-5"));
        assert_eq!(board[2], BoardEntry::new(3, "w2-5"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_units_start_together() {
        let sink = Arc::new(MemorySink::new());
        let config = PlaybackConfig {
            return_on_completion: true,
            start_barrier_grace: Duration::from_millis(100),
            ..quick_config(5)
        };
        let coordinator = Coordinator::new(config, sink.clone()).unwrap();
        let records: Vec<_> = (1..=5).map(|w| MessageRecord::new(w, 1, 10, "hi")).collect();

        coordinator.run(&records, CancellationToken::new()).await.unwrap();

        let emissions = sink.emissions();
        assert_eq!(emissions.len(), 5);
        let first = emissions.iter().map(|e| e.emitted_at).min().unwrap();
        let last = emissions.iter().map(|e| e.emitted_at).max().unwrap();
        assert!(
            last - first < chrono::Duration::milliseconds(50),
            "first emissions spread over {:?}",
            last - first
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancellation_stops_playback() {
        let sink = Arc::new(MemorySink::new());
        let config = PlaybackConfig {
            pacing_scale_factor: 1000,
            ..quick_config(2)
        };
        let coordinator = Coordinator::new(config, sink.clone()).unwrap();
        let records = vec![
            MessageRecord::new(1, 2, 10, "one"),
            MessageRecord::new(1, 2, 10, "two"),
            MessageRecord::new(2, 1, 10_000, "three"),
        ];

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = coordinator.run(&records, cancel).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));

        // Both units emitted their first record, then stayed paused until aborted
        assert_eq!(sink.len(), 2);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_before_start() {
        let sink = Arc::new(MemorySink::new());
        let config = PlaybackConfig {
            start_barrier_grace: Duration::from_secs(60),
            ..quick_config(1)
        };
        let coordinator = Coordinator::new(config, sink.clone()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = coordinator
            .run(&[MessageRecord::new(1, 1, 10, "x")], cancel)
            .await
            .unwrap();
        assert_eq!(outcome, PlaybackOutcome::Cancelled);
        assert!(sink.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalid_destination_fails_run() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = Coordinator::new(quick_config(2), sink.clone()).unwrap();
        let records = vec![
            MessageRecord::new(1, 2, 10_000, "ok"),
            MessageRecord::new(2, 6, 10, "bad"),
        ];

        let err = coordinator.run(&records, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::InvalidDestination { worker: 2, index: 0, destination: 6, .. }
        ));
        assert!(sink.emissions().iter().all(|e| e.message != "bad"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_negative_destination_from_recorded_json_fails_run() {
        let text = "\
{\"worker\":2,\"destination_worker\":-1,\"interval\":10,\"message\":\"bad\"}
{\"worker\":1,\"destination_worker\":2,\"interval\":10,\"message\":\"ok\"}
";
        let records = parse_json_lines(text);
        assert_eq!(records.len(), 2);

        let sink = Arc::new(MemorySink::new());
        let coordinator = Coordinator::new(quick_config(2), sink.clone()).unwrap();
        let err = coordinator.run(&records, CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            PlaybackError::InvalidDestination {
                worker: 2,
                index: 0,
                destination: -1,
                worker_count: 2,
                message: "bad".to_string(),
            }
        );
        assert!(sink.emissions().iter().all(|e| e.message != "bad"));
    }

    #[tokio::test]
    async fn test_nothing_to_replay() {
        let sink = Arc::new(MemorySink::new());
        let coordinator = Coordinator::new(quick_config(2), sink.clone()).unwrap();

        // Only a sender outside the configured range
        let records = vec![MessageRecord::new(4, 1, 10, "nobody plays this")];
        let outcome = coordinator.run(&records, CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let sink = Arc::new(MemorySink::new());
        let config = PlaybackConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(Coordinator::new(config, sink).is_err());
    }
}
