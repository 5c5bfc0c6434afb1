//! Batching configuration.

use std::time::Duration;

use crate::error::{BatchError, BatchResult};

/// Default upper bound on how long a message may wait before being flushed.
pub const DEFAULT_FLUSH_MAX_DELAY: Duration = Duration::from_micros(1_000_000);

/// Default queue capacity (and capacity-flush threshold).
pub const DEFAULT_FLUSH_MAX_QUEUE_SIZE: usize = 100;

/// Default full-queue policy.
pub const DEFAULT_BLOCK_WHEN_FULL: bool = true;

/// Configuration for a [`BatchPublisher`](crate::BatchPublisher).
///
/// Constructed once per publisher and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchingOptions {
    /// Upper bound on how long a message may sit in the queue unflushed.
    pub flush_max_delay: Duration,
    /// Capacity of the queue. Reaching it triggers an immediate flush.
    pub flush_max_queue_size: usize,
    /// When the queue is full: `true` suspends the producer until space is
    /// freed, `false` silently discards the message.
    pub block_when_full: bool,
}

impl Default for BatchingOptions {
    fn default() -> Self {
        Self {
            flush_max_delay: DEFAULT_FLUSH_MAX_DELAY,
            flush_max_queue_size: DEFAULT_FLUSH_MAX_QUEUE_SIZE,
            block_when_full: DEFAULT_BLOCK_WHEN_FULL,
        }
    }
}

impl BatchingOptions {
    pub fn new(flush_max_delay: Duration, flush_max_queue_size: usize, block_when_full: bool) -> Self {
        Self {
            flush_max_delay,
            flush_max_queue_size,
            block_when_full,
        }
    }

    /// Set the maximum flush delay.
    pub fn with_flush_max_delay(mut self, delay: Duration) -> Self {
        self.flush_max_delay = delay;
        self
    }

    /// Set the queue capacity.
    pub fn with_flush_max_queue_size(mut self, size: usize) -> Self {
        self.flush_max_queue_size = size;
        self
    }

    /// Suspend producers while the queue is full.
    pub fn block_when_full(mut self) -> Self {
        self.block_when_full = true;
        self
    }

    /// Discard messages while the queue is full.
    pub fn drop_when_full(mut self) -> Self {
        self.block_when_full = false;
        self
    }

    /// Check the options' invariants.
    pub fn validate(&self) -> BatchResult<()> {
        if self.flush_max_queue_size == 0 {
            return Err(BatchError::InvalidOptions(
                "flush_max_queue_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
