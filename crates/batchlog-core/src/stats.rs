//! Delivery counters for a publisher.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between producers and the flush task.
///
/// Drops under the drop-when-full policy are reported to callers as
/// successes, so these counters are the only place they show up.
#[derive(Debug, Default)]
pub struct PublisherStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    batches_flushed: AtomicU64,
    messages_flushed: AtomicU64,
}

/// Point-in-time copy of [`PublisherStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub dropped: u64,
    pub batches_flushed: u64,
    pub messages_flushed: u64,
}

impl PublisherStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, batch_len: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.messages_flushed
            .fetch_add(batch_len as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            messages_flushed: self.messages_flushed.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Messages accepted into the queue but not yet handed to the sink.
    pub fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.messages_flushed)
    }
}
