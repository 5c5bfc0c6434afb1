//! Bounded FIFO queue shared by producers and the flush task.
//!
//! ```text
//! producers ──enqueue──▶ ┌──────────────────────────┐ ──drain_all──▶ flush task
//!                        │ VecDeque<M> (≤ capacity) │
//!   wait for space ◀──── └──────────────────────────┘ ────▶ arrived / filled
//! ```
//!
//! Producers may call [`BoundedChannel::enqueue`] concurrently. Draining and
//! the occupancy predicates are meant for the single consumer. All of them go
//! through one mutex, so occupancy is never observed half-updated.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{BatchError, BatchResult};
use crate::stats::PublisherStats;

/// What happened to a message handed to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the queue.
    Enqueued,
    /// Discarded because the queue was full.
    Dropped,
    /// Discarded because the consumer has stopped.
    Closed,
}

impl EnqueueOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, EnqueueOutcome::Enqueued)
    }
}

struct ChannelInner<M> {
    queue: VecDeque<M>,
    closed: bool,
}

/// Fixed-capacity message queue with a configurable full-queue policy.
pub struct BoundedChannel<M> {
    inner: Mutex<ChannelInner<M>>,
    capacity: usize,
    block_when_full: bool,
    /// Producers blocked on a full queue.
    space: Notify,
    /// Queue went from empty to non-empty.
    arrived: Notify,
    /// Queue reached capacity.
    filled: Notify,
    stats: Arc<PublisherStats>,
}

impl<M> BoundedChannel<M> {
    /// Create a channel. Fails if `capacity` is zero.
    ///
    /// The queue grows on demand, so a huge capacity costs nothing up front.
    pub fn new(
        capacity: usize,
        block_when_full: bool,
        stats: Arc<PublisherStats>,
    ) -> BatchResult<Self> {
        if capacity == 0 {
            return Err(BatchError::InvalidOptions(
                "channel capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            inner: Mutex::new(ChannelInner {
                queue: VecDeque::new(),
                closed: false,
            }),
            capacity,
            block_when_full,
            space: Notify::new(),
            arrived: Notify::new(),
            filled: Notify::new(),
            stats,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn blocks_when_full(&self) -> bool {
        self.block_when_full
    }

    /// Append a message.
    ///
    /// At capacity this either suspends until [`drain_all`](Self::drain_all)
    /// frees space or discards the message, depending on the policy. Once the
    /// channel is closed every message is discarded.
    pub async fn enqueue(&self, msg: M) -> EnqueueOutcome {
        loop {
            // Register interest before checking occupancy so a drain that
            // lands between the check and the await still wakes us.
            let space = self.space.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    drop(inner);
                    self.stats.record_dropped();
                    return EnqueueOutcome::Closed;
                }
                if inner.queue.len() < self.capacity {
                    self.push_locked(&mut inner, msg);
                    return EnqueueOutcome::Enqueued;
                }
                if !self.block_when_full {
                    drop(inner);
                    self.stats.record_dropped();
                    tracing::trace!(capacity = self.capacity, "Queue full, message dropped");
                    return EnqueueOutcome::Dropped;
                }
            }

            space.await;
        }
    }

    /// Append a message without ever suspending.
    ///
    /// A full queue discards the message regardless of the blocking policy.
    pub fn try_enqueue(&self, msg: M) -> EnqueueOutcome {
        let mut inner = self.inner.lock();
        if inner.closed {
            drop(inner);
            self.stats.record_dropped();
            return EnqueueOutcome::Closed;
        }
        if inner.queue.len() < self.capacity {
            self.push_locked(&mut inner, msg);
            return EnqueueOutcome::Enqueued;
        }
        drop(inner);
        self.stats.record_dropped();
        EnqueueOutcome::Dropped
    }

    fn push_locked(&self, inner: &mut ChannelInner<M>, msg: M) {
        inner.queue.push_back(msg);
        self.stats.record_enqueued();

        let len = inner.queue.len();
        if len == 1 {
            self.arrived.notify_one();
        }
        if len == self.capacity {
            self.filled.notify_one();
        }
    }

    /// Take everything currently queued, in arrival order.
    ///
    /// Never blocks. Wakes every producer waiting for space.
    pub fn drain_all(&self) -> Vec<M> {
        let batch = {
            let mut inner = self.inner.lock();
            Vec::from(std::mem::take(&mut inner.queue))
        };
        if !batch.is_empty() {
            self.space.notify_waiters();
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().queue.len() >= self.capacity
    }

    /// Stop accepting messages and release blocked producers.
    ///
    /// Messages already queued stay available to [`drain_all`](Self::drain_all).
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.space.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Resolves after the queue went from empty to non-empty.
    ///
    /// May resolve spuriously; callers re-check [`is_empty`](Self::is_empty).
    pub(crate) async fn wait_non_empty(&self) {
        self.arrived.notified().await
    }

    /// Resolves after the queue reached capacity.
    ///
    /// May resolve spuriously; callers re-check [`is_full`](Self::is_full).
    pub(crate) async fn wait_full(&self) {
        self.filled.notified().await
    }
}
