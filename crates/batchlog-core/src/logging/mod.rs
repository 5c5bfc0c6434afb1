//! Structured records, JSONL files and the `tracing` bridge.
//!
//! ## Usage
//!
//! ### Sending tracing events to a batched JSONL file
//!
//! ```ignore
//! use batchlog_core::logging::{open_log_file, BatchedLayer};
//! use batchlog_core::{BatchPublisher, BatchingOptions, WriterSink};
//! use tracing_subscriber::prelude::*;
//!
//! let (_path, file) = open_log_file("./logs", "api").await?;
//! let publisher = BatchPublisher::spawn(BatchingOptions::default(), WriterSink::new(file))?;
//!
//! let subscriber = tracing_subscriber::registry()
//!     .with(BatchedLayer::new(publisher.handler(), "api"))
//!     .with(tracing_subscriber::fmt::layer());
//! tracing::subscriber::set_global_default(subscriber)?;
//!
//! // ... run the application ...
//!
//! publisher.shutdown().await?;
//! ```
//!
//! ### Querying logs with jq
//!
//! ```bash
//! jq 'select(.level == "error")' logs/raw/*.jsonl
//! ```

pub mod entry;
pub mod layer;
pub mod writer;

pub use entry::LogRecord;
pub use layer::BatchedLayer;
pub use writer::{log_file_path, open_log_file, read_all_records, read_records};
