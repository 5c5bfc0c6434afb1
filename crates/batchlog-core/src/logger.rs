//! The emission capability and its non-batching implementations.
//!
//! Business code takes a `&impl Logger<M>` and never learns where messages
//! go. The caller picks the strategy: a batching [`Handler`], a
//! [`PureLogger`] that collects messages in memory, a [`DiscardLogger`], or
//! any of these behind a [`MapLogger`] that converts message types.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::publisher::Handler;

/// Something that accepts messages of type `M`.
pub trait Logger<M>: Send + Sync {
    /// Emit one message. Never fails; delivery is the implementation's
    /// concern.
    fn log_message(&self, msg: M) -> impl Future<Output = ()> + Send;
}

impl<M: Send> Logger<M> for Handler<M> {
    fn log_message(&self, msg: M) -> impl Future<Output = ()> + Send {
        self.log(msg)
    }
}

impl<M, L> Logger<M> for &L
where
    L: Logger<M> + ?Sized,
{
    fn log_message(&self, msg: M) -> impl Future<Output = ()> + Send {
        (**self).log_message(msg)
    }
}

impl<M, L> Logger<M> for Arc<L>
where
    L: Logger<M> + ?Sized,
{
    fn log_message(&self, msg: M) -> impl Future<Output = ()> + Send {
        (**self).log_message(msg)
    }
}

/// Collects every message in memory, in emission order.
#[derive(Debug)]
pub struct PureLogger<M> {
    messages: Mutex<Vec<M>>,
}

impl<M> Default for PureLogger<M> {
    fn default() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl<M> PureLogger<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn take_messages(&self) -> Vec<M> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn into_messages(self) -> Vec<M> {
        self.messages.into_inner()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl<M: Send> Logger<M> for PureLogger<M> {
    fn log_message(&self, msg: M) -> impl Future<Output = ()> + Send {
        self.messages.lock().push(msg);
        std::future::ready(())
    }
}

/// Accepts and discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardLogger;

impl<M> Logger<M> for DiscardLogger {
    fn log_message(&self, msg: M) -> impl Future<Output = ()> + Send {
        drop(msg);
        std::future::ready(())
    }
}

/// Converts messages before forwarding them to an inner logger.
///
/// Built with [`map_log_message`].
#[derive(Debug, Clone)]
pub struct MapLogger<L, F> {
    inner: L,
    f: F,
}

/// Present `logger` (which accepts `M`) as a logger of `N`, converting each
/// message with `f`.
///
/// ```ignore
/// let handler: Handler<WithSeverity<String>> = publisher.handler();
/// let errors = map_log_message(handler, |msg: String| WithSeverity::new(Severity::Error, msg));
/// errors.log_message("disk full".to_string()).await;
/// ```
pub fn map_log_message<L, F>(logger: L, f: F) -> MapLogger<L, F> {
    MapLogger { inner: logger, f }
}

impl<L, F> MapLogger<L, F> {
    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<N, M, L, F> Logger<N> for MapLogger<L, F>
where
    L: Logger<M>,
    F: Fn(N) -> M + Send + Sync,
{
    fn log_message(&self, msg: N) -> impl Future<Output = ()> + Send {
        self.inner.log_message((self.f)(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn business_logic(log: &impl Logger<String>, items: &[&str]) -> usize {
        for item in items {
            log.log_message(format!("processing {}", item)).await;
        }
        items.len()
    }

    #[tokio::test]
    async fn test_pure_logger_collects_in_order() {
        let log = PureLogger::new();
        let n = business_logic(&log, &["a", "b"]).await;

        assert_eq!(n, 2);
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.take_messages(),
            vec!["processing a".to_string(), "processing b".to_string()]
        );
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_discard_logger_accepts_anything() {
        let n = business_logic(&DiscardLogger, &["x", "y", "z"]).await;
        assert_eq!(n, 3);
        Logger::<u64>::log_message(&DiscardLogger, 7).await;
    }

    #[tokio::test]
    async fn test_map_logger_converts_messages() {
        let sink = PureLogger::<usize>::new();
        let lengths = map_log_message(&sink, |msg: String| msg.len());

        business_logic(&lengths, &["ab", "abcd"]).await;

        assert_eq!(sink.into_messages(), vec![13, 15]);
    }

    #[tokio::test]
    async fn test_arc_logger_forwards() {
        let shared = Arc::new(PureLogger::new());
        business_logic(&Arc::clone(&shared), &["one"]).await;
        assert_eq!(shared.take_messages(), vec!["processing one".to_string()]);
    }
}
