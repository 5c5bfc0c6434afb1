//! Error types for batchlog

use thiserror::Error;

/// Boxed error produced by a [`BatchSink`](crate::BatchSink) flush.
pub type FlushFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for batchlog operations
#[derive(Error, Debug)]
pub enum BatchError {
    /// Batching options violate an invariant (e.g. zero queue size)
    #[error("Invalid batching options: {0}")]
    InvalidOptions(String),

    /// The sink failed to flush a batch; the publisher stopped
    #[error("Flush failed: {0}")]
    Flush(#[source] FlushFailure),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error during serialization/deserialization of log records
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The background flush task panicked or was aborted
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BatchError {
    /// Wrap a sink error.
    pub fn flush(err: impl Into<FlushFailure>) -> Self {
        BatchError::Flush(err.into())
    }
}

/// Result type alias using BatchError
pub type BatchResult<T> = Result<T, BatchError>;
