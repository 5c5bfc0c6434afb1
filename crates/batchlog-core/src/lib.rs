//! batchlog Core Library
//!
//! Structured log emission decoupled from delivery, with a batching engine
//! that buffers messages and flushes them to a sink in batches.
//!
//! ## Overview
//!
//! Application code emits messages through a [`Logger`]. The batching
//! implementation, [`Handler`], pushes each message into a bounded queue
//! owned by a [`BatchPublisher`]. A background task flushes the queue to a
//! [`BatchSink`] when the first of these happens:
//!
//! - the oldest pending message has waited `flush_max_delay`
//! - the queue reaches `flush_max_queue_size`
//! - the publisher is shut down
//!
//! Messages reach the sink exactly once, in enqueue order. Shutdown waits for
//! the final flush and reports sink failures.
//!
//! ## Quick Start
//!
//! ```ignore
//! use batchlog_core::{with_writer_handler, BatchingOptions, Severity, WithSeverity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     with_writer_handler(BatchingOptions::default(), tokio::io::stdout(), |log| async move {
//!         log.log(WithSeverity::new(Severity::Informational, "starting")).await;
//!         log.log(WithSeverity::new(Severity::Warning, "low disk space")).await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod logger;
pub mod logging;
pub mod message;
pub mod options;
pub mod publisher;
pub mod sink;
pub mod stats;
pub mod timer;

// Re-exports
pub use channel::{BoundedChannel, EnqueueOutcome};
pub use error::{BatchError, BatchResult, FlushFailure};
pub use logger::{map_log_message, DiscardLogger, Logger, MapLogger, PureLogger};
pub use logging::{BatchedLayer, LogRecord};
pub use message::{
    log_debug, log_error, log_info, log_warning, log_with_severity, timestamp_now, Severity,
    WithCallSite, WithSeverity, WithTimestamp,
};
pub use options::BatchingOptions;
pub use publisher::{with_batched_handler, BatchPublisher, FlushTrigger, Handler, PublisherState};
pub use sink::{
    sink_fn, stderr_publisher, stdout_publisher, with_writer_handler, BatchSink, FnSink,
    WriterSink,
};
pub use stats::{PublisherStats, StatsSnapshot};
pub use timer::FlushTimer;
