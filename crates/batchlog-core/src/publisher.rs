//! Batch publisher: the background flush engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ log()  ┌────────────────┐ drain_all ┌─────────────┐
//! │ Handler (×N) │───────▶│ BoundedChannel │──────────▶│ FlushWorker │──▶ BatchSink
//! └──────────────┘        └────────────────┘           └─────────────┘
//!                                                      races: timer | full | closed
//! ```
//!
//! The worker loops until the publisher is closed:
//!
//! 1. Wait for the first message of the next batch, then arm a
//!    [`FlushTimer`] for `flush_max_delay`.
//! 2. Race the timer, the queue filling up and the close signal.
//! 3. Drain everything queued and hand it to the sink.
//!
//! On close it drains until the queue is empty, closes the channel and
//! exits. A sink error stops the worker immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::{BoundedChannel, EnqueueOutcome};
use crate::error::{BatchError, BatchResult};
use crate::options::BatchingOptions;
use crate::sink::BatchSink;
use crate::stats::{PublisherStats, StatsSnapshot};
use crate::timer::FlushTimer;

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The flush timer fired with messages pending.
    Interval,
    /// The queue reached capacity.
    Capacity,
    /// The publisher is shutting down.
    Close,
}

/// Lifecycle of a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    Running,
    /// Close requested; the worker is performing its final drain.
    Closing,
    Stopped,
}

/// Enqueue side of a publisher.
///
/// Cheap to clone and safe to share between tasks. Only meaningful while the
/// owning [`BatchPublisher`] is alive; afterwards messages are discarded.
pub struct Handler<M> {
    channel: Arc<BoundedChannel<M>>,
    stats: Arc<PublisherStats>,
}

impl<M> Clone for Handler<M> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<M> std::fmt::Debug for Handler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("capacity", &self.channel.capacity())
            .field("queued", &self.channel.len())
            .finish()
    }
}

impl<M> Handler<M> {
    /// Queue a message for the next batch.
    ///
    /// Suspends while the queue is full under the block-when-full policy.
    /// Under drop-when-full the message may be discarded; either way the
    /// call reports nothing back.
    pub async fn log(&self, msg: M) {
        self.channel.enqueue(msg).await;
    }

    /// Queue a message, reporting what happened to it.
    pub async fn enqueue(&self, msg: M) -> EnqueueOutcome {
        self.channel.enqueue(msg).await
    }

    /// Queue a message without suspending. Returns `false` if it was dropped.
    pub fn try_log(&self, msg: M) -> bool {
        self.channel.try_enqueue(msg).is_enqueued()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// `true` once the flush worker has stopped accepting messages.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

/// Owns the flush worker of one batching pipeline.
///
/// Call [`shutdown`](Self::shutdown) to flush everything and observe sink
/// errors. Dropping the publisher instead still closes it: the detached
/// worker drains what is queued, but errors are only logged.
pub struct BatchPublisher<M> {
    handler: Handler<M>,
    closed: CancellationToken,
    task: Option<JoinHandle<BatchResult<()>>>,
}

impl<M: Send + 'static> BatchPublisher<M> {
    /// Validate `options` and start the flush worker on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<S>(options: BatchingOptions, sink: S) -> BatchResult<Self>
    where
        S: BatchSink<M>,
    {
        options.validate()?;

        let stats = Arc::new(PublisherStats::new());
        let channel = Arc::new(BoundedChannel::new(
            options.flush_max_queue_size,
            options.block_when_full,
            Arc::clone(&stats),
        )?);
        let closed = CancellationToken::new();

        let worker = FlushWorker {
            channel: Arc::clone(&channel),
            closed: closed.clone(),
            sink,
            delay: options.flush_max_delay,
            stats: Arc::clone(&stats),
        };

        debug!(
            flush_max_delay = ?options.flush_max_delay,
            flush_max_queue_size = options.flush_max_queue_size,
            block_when_full = options.block_when_full,
            "Starting batch publisher"
        );
        let task = tokio::spawn(worker.run());

        Ok(Self {
            handler: Handler { channel, stats },
            closed,
            task: Some(task),
        })
    }
}

impl<M> BatchPublisher<M> {
    pub fn handler(&self) -> Handler<M> {
        self.handler.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.handler.stats()
    }

    pub fn state(&self) -> PublisherState {
        match &self.task {
            Some(task) if task.is_finished() => PublisherState::Stopped,
            Some(_) if self.closed.is_cancelled() => PublisherState::Closing,
            Some(_) => PublisherState::Running,
            None => PublisherState::Stopped,
        }
    }

    /// Close the publisher and wait for the final flush.
    ///
    /// Every message queued before this call has been handed to the sink,
    /// in order, when it returns `Ok`. A failed or panicked flush is
    /// returned as an error. An in-flight flush is never interrupted.
    pub async fn shutdown(mut self) -> BatchResult<()> {
        self.closed.cancel();
        match self.task.take() {
            Some(task) => task.await?,
            None => Ok(()),
        }
    }
}

impl<M> Drop for BatchPublisher<M> {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

/// Run `body` with a batching handler, then shut the publisher down.
///
/// Leaving the scope by returning, panicking or being cancelled always
/// closes the publisher. Only the returning path waits for the final flush
/// and reports sink errors.
pub async fn with_batched_handler<M, S, F, Fut, T>(
    options: BatchingOptions,
    sink: S,
    body: F,
) -> BatchResult<T>
where
    M: Send + 'static,
    S: BatchSink<M>,
    F: FnOnce(Handler<M>) -> Fut,
    Fut: Future<Output = T>,
{
    let publisher = BatchPublisher::spawn(options, sink)?;
    let output = body(publisher.handler()).await;
    publisher.shutdown().await?;
    Ok(output)
}

/// Wait until one of the flush conditions holds.
async fn next_trigger<M>(
    channel: &BoundedChannel<M>,
    closed: &CancellationToken,
    delay: Duration,
) -> FlushTrigger {
    loop {
        // Arm the timer only once there is something to flush, so an idle
        // interval never produces a flush.
        while channel.is_empty() {
            tokio::select! {
                biased;
                _ = closed.cancelled() => return FlushTrigger::Close,
                _ = channel.wait_non_empty() => {}
            }
        }

        let mut timer = FlushTimer::new(delay);
        loop {
            tokio::select! {
                biased;
                _ = closed.cancelled() => return FlushTrigger::Close,
                _ = channel.wait_full() => {
                    if channel.is_full() {
                        return FlushTrigger::Capacity;
                    }
                }
                _ = timer.fired() => {
                    if !channel.is_empty() {
                        return FlushTrigger::Interval;
                    }
                    break;
                }
            }
        }
    }
}

/// Closes the channel when the worker exits, including by panic.
struct CloseOnExit<M>(Arc<BoundedChannel<M>>);

impl<M> Drop for CloseOnExit<M> {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct FlushWorker<M, S> {
    channel: Arc<BoundedChannel<M>>,
    closed: CancellationToken,
    sink: S,
    delay: Duration,
    stats: Arc<PublisherStats>,
}

impl<M, S> FlushWorker<M, S>
where
    M: Send + 'static,
    S: BatchSink<M>,
{
    async fn run(mut self) -> BatchResult<()> {
        let _close_guard = CloseOnExit(Arc::clone(&self.channel));

        loop {
            let trigger = next_trigger(&self.channel, &self.closed, self.delay).await;
            let batch = self.channel.drain_all();
            self.flush(batch, trigger).await?;

            if self.closed.is_cancelled() {
                break;
            }
        }

        self.finish().await?;
        debug!(stats = ?self.stats.snapshot(), "Batch publisher stopped");
        Ok(())
    }

    /// Final drain after close.
    async fn finish(&mut self) -> BatchResult<()> {
        loop {
            let batch = self.channel.drain_all();
            if batch.is_empty() {
                break;
            }
            self.flush(batch, FlushTrigger::Close).await?;
        }

        // Anything that slipped in between the last drain and the close
        self.channel.close();
        let rest = self.channel.drain_all();
        self.flush(rest, FlushTrigger::Close).await
    }

    async fn flush(&mut self, batch: Vec<M>, trigger: FlushTrigger) -> BatchResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let len = batch.len();
        debug!(?trigger, batch_size = len, "Flushing batch");

        if let Err(e) = self.sink.flush(batch).await {
            let err = BatchError::flush(e);
            warn!(?trigger, batch_size = len, error = %err, "Flush failed, stopping publisher");
            return Err(err);
        }

        self.stats.record_flush(len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use tokio::time::Instant;

    use crate::sink::sink_fn;

    type Recorded<M> = Arc<Mutex<Vec<(Instant, Vec<M>)>>>;

    fn recording_sink<M: Send + 'static>() -> (impl BatchSink<M>, Recorded<M>) {
        let recorded: Recorded<M> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let recorded = Arc::clone(&recorded);
            sink_fn(move |batch: Vec<M>| {
                recorded.lock().push((Instant::now(), batch));
                std::future::ready(Ok::<_, std::io::Error>(()))
            })
        };
        (sink, recorded)
    }

    fn batches<M: Clone>(recorded: &Recorded<M>) -> Vec<Vec<M>> {
        recorded.lock().iter().map(|(_, b)| b.clone()).collect()
    }

    #[tokio::test]
    async fn test_spawn_rejects_zero_capacity() {
        let (sink, _) = recording_sink::<u32>();
        let options = BatchingOptions::default().with_flush_max_queue_size(0);
        let result = BatchPublisher::spawn(options, sink);
        assert!(matches!(result, Err(BatchError::InvalidOptions(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let (sink, _) = recording_sink::<u32>();
        let publisher = BatchPublisher::spawn(BatchingOptions::default(), sink).unwrap();
        assert_eq!(publisher.state(), PublisherState::Running);

        publisher.closed.cancel();
        assert!(matches!(
            publisher.state(),
            PublisherState::Closing | PublisherState::Stopped
        ));

        let handler = publisher.handler();
        publisher.shutdown().await.unwrap();
        assert!(handler.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_messages() {
        let (sink, recorded) = recording_sink();
        let publisher = BatchPublisher::spawn(BatchingOptions::default(), sink).unwrap();
        let log = publisher.handler();

        for i in 0..5u32 {
            log.log(i).await;
        }
        publisher.shutdown().await.unwrap();

        assert_eq!(batches(&recorded), vec![vec![0, 1, 2, 3, 4]]);
        let stats = log.stats();
        assert_eq!(stats.enqueued, 5);
        assert_eq!(stats.messages_flushed, 5);
        assert_eq!(stats.batches_flushed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_flush_after_delay() {
        let delay = Duration::from_millis(50);
        let (sink, recorded) = recording_sink();
        let options = BatchingOptions::default().with_flush_max_delay(delay);
        let publisher = BatchPublisher::spawn(options, sink).unwrap();

        let start = Instant::now();
        publisher.handler().log("only").await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        {
            let recorded = recorded.lock();
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0].1, vec!["only"]);
            assert!(recorded[0].0 - start >= delay);
            assert!(recorded[0].0 - start < delay + Duration::from_millis(5));
        }

        publisher.shutdown().await.unwrap();
        assert_eq!(recorded.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_flush_is_immediate() {
        let (sink, recorded) = recording_sink();
        let options = BatchingOptions::default()
            .with_flush_max_delay(Duration::from_secs(3600))
            .with_flush_max_queue_size(3);
        let publisher = BatchPublisher::spawn(options, sink).unwrap();
        let log = publisher.handler();

        let start = Instant::now();
        for i in 0..3u32 {
            log.log(i).await;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        {
            let recorded = recorded.lock();
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0].1, vec![0, 1, 2]);
            assert!(recorded[0].0 - start < Duration::from_millis(1));
        }

        publisher.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_interval_does_not_flush() {
        let (sink, recorded) = recording_sink::<u32>();
        let options = BatchingOptions::default().with_flush_max_delay(Duration::from_millis(10));
        let publisher = BatchPublisher::spawn(options, sink).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(recorded.lock().is_empty());

        publisher.shutdown().await.unwrap();
        assert!(recorded.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_error_surfaces_on_shutdown() {
        let sink = sink_fn(|_batch: Vec<u32>| async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
        });
        let options = BatchingOptions::default().with_flush_max_queue_size(2);
        let publisher = BatchPublisher::spawn(options, sink).unwrap();
        let log = publisher.handler();

        log.log(1).await;
        log.log(2).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        // The worker died on the capacity flush; later messages are discarded
        assert!(log.is_closed());
        assert_eq!(log.enqueue(3).await, EnqueueOutcome::Closed);

        let err = publisher.shutdown().await.unwrap_err();
        assert!(matches!(err, BatchError::Flush(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_and_drains() {
        let (sink, recorded) = recording_sink();
        let publisher = BatchPublisher::spawn(BatchingOptions::default(), sink).unwrap();
        let log = publisher.handler();

        log.log("a").await;
        log.log("b").await;
        drop(publisher);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(batches(&recorded), vec![vec!["a", "b"]]);
        assert!(log.is_closed());
        assert!(!log.try_log("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_batched_handler_returns_body_output() {
        let (sink, recorded) = recording_sink();

        let out = with_batched_handler(BatchingOptions::default(), sink, |log| async move {
            log.log(10u32).await;
            log.log(20u32).await;
            "done"
        })
        .await
        .unwrap();

        assert_eq!(out, "done");
        assert_eq!(batches(&recorded), vec![vec![10, 20]]);
    }
}
