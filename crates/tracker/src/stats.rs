use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of a tracker's counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStats {
    /// Events passed to `track`.
    pub tracked: u64,

    /// Batches the sink accepted.
    pub batches_delivered: u64,

    /// Events the sink accepted.
    pub events_delivered: u64,

    /// Delivery attempts the sink rejected.
    pub failed_deliveries: u64,

    /// Events put back into the queue after a rejected delivery.
    pub requeued: u64,

    /// Events discarded because the queue was full.
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    tracked: AtomicU64,
    batches_delivered: AtomicU64,
    events_delivered: AtomicU64,
    failed_deliveries: AtomicU64,
    requeued: AtomicU64,
    dropped: AtomicU64,
}

const fn count(events: usize) -> u64 {
    events as u64
}

impl Counters {
    pub(crate) fn tracked(&self) {
        self.tracked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self, events: usize) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.events_delivered
            .fetch_add(count(events), Ordering::Relaxed);
    }

    pub(crate) fn failed(&self, events: usize) {
        self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
        self.requeued.fetch_add(count(events), Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self, events: usize) {
        self.dropped.fetch_add(count(events), Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TrackerStats {
        TrackerStats {
            tracked: self.tracked.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
