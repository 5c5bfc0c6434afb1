//! Flush targets for the batch publisher.
//!
//! A sink receives each drained batch, in order, from the publisher's single
//! flush task. It is never called concurrently with itself, so it can own
//! its output without further locking.

use std::fmt::{Display, Write as FmtWrite};
use std::future::Future;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::BatchResult;
use crate::options::BatchingOptions;
use crate::publisher::{with_batched_handler, BatchPublisher, Handler};

/// Destination for drained batches.
///
/// Errors are not retried: the first failure stops the publisher and is
/// reported from [`BatchPublisher::shutdown`].
pub trait BatchSink<M>: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Deliver one batch. Batches arrive in enqueue order.
    fn flush(&mut self, batch: Vec<M>) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Sink built from a closure. See [`sink_fn`].
#[derive(Debug, Clone)]
pub struct FnSink<F> {
    f: F,
}

/// Adapt an async closure into a [`BatchSink`].
///
/// ```ignore
/// let sink = sink_fn(|batch: Vec<String>| async move {
///     println!("{} messages", batch.len());
///     Ok::<_, std::io::Error>(())
/// });
/// ```
pub fn sink_fn<F>(f: F) -> FnSink<F> {
    FnSink { f }
}

impl<M, F, Fut, E> BatchSink<M> for FnSink<F>
where
    F: FnMut(Vec<M>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn flush(&mut self, batch: Vec<M>) -> impl Future<Output = Result<(), E>> + Send {
        (self.f)(batch)
    }
}

/// Writes each message as one line of text.
///
/// A batch is rendered into a single buffer and written with one
/// `write_all`, followed by a flush of the underlying writer.
pub struct WriterSink<W> {
    writer: W,
    buf: String,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: String::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render a batch as newline-terminated lines.
pub fn render_lines<M: Display>(batch: &[M], buf: &mut String) {
    for msg in batch {
        // Writing into a String cannot fail
        let _ = writeln!(buf, "{}", msg);
    }
}

impl<M, W> BatchSink<M> for WriterSink<W>
where
    M: Display + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = std::io::Error;

    fn flush(&mut self, batch: Vec<M>) -> impl Future<Output = std::io::Result<()>> + Send {
        self.buf.clear();
        render_lines(&batch, &mut self.buf);
        drop(batch);

        async move {
            self.writer.write_all(self.buf.as_bytes()).await?;
            self.writer.flush().await
        }
    }
}

/// Run `body` with a handler that writes batched lines to `writer`.
///
/// The publisher is shut down when `body` completes; every message logged by
/// then has been written. A write failure is returned instead of `body`'s
/// output.
pub async fn with_writer_handler<M, W, F, Fut, T>(
    options: BatchingOptions,
    writer: W,
    body: F,
) -> BatchResult<T>
where
    M: Display + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    F: FnOnce(Handler<M>) -> Fut,
    Fut: Future<Output = T>,
{
    with_batched_handler(options, WriterSink::new(writer), body).await
}

/// Spawn a publisher writing lines to the process's standard output.
pub fn stdout_publisher<M>(options: BatchingOptions) -> BatchResult<BatchPublisher<M>>
where
    M: Display + Send + 'static,
{
    BatchPublisher::spawn(options, WriterSink::new(tokio::io::stdout()))
}

/// Spawn a publisher writing lines to the process's standard error.
pub fn stderr_publisher<M>(options: BatchingOptions) -> BatchResult<BatchPublisher<M>>
where
    M: Display + Send + 'static,
{
    BatchPublisher::spawn(options, WriterSink::new(tokio::io::stderr()))
}
