use crate::core::{MessageRecord, WorkerId};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Ordered records belonging to one worker
pub type WorkerTimeline = Vec<MessageRecord>;

/// Split a flat record list into one timeline per sending worker.
///
/// Relative order within each worker is kept as given. Workers without
/// records get no entry, and records whose sender is outside
/// `1..=worker_count` are ignored.
pub fn route(
    records: &[MessageRecord],
    worker_count: usize,
) -> BTreeMap<WorkerId, WorkerTimeline> {
    let mut timelines: BTreeMap<WorkerId, WorkerTimeline> = BTreeMap::new();

    for record in records {
        let supported = usize::try_from(record.worker)
            .map_or(false, |worker| (1..=worker_count).contains(&worker));
        if !supported {
            debug!(
                "Ignoring record from unsupported worker {}: {:?}",
                record.worker, record.message
            );
            continue;
        }
        timelines.entry(record.worker).or_default().push(record.clone());
    }

    timelines
}

/// Sum of every record interval, routed or not
pub fn total_interval(records: &[MessageRecord]) -> Duration {
    Duration::from_millis(records.iter().fold(0u64, |acc, r| acc.saturating_add(r.interval)))
}
