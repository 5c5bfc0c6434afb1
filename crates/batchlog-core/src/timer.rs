//! One-shot flush timer.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Single-fire alarm bounding how long a batch may stay buffered.
///
/// A fresh timer is created for every flush cycle. Once fired it stays fired,
/// so awaiting it again completes immediately.
#[derive(Debug)]
pub struct FlushTimer {
    sleep: Pin<Box<Sleep>>,
    fired: bool,
}

impl FlushTimer {
    /// Arm a timer that fires `delay` from now.
    pub fn new(delay: Duration) -> Self {
        Self {
            sleep: Box::pin(tokio::time::sleep(delay)),
            fired: false,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    pub fn has_fired(&self) -> bool {
        self.fired || self.sleep.is_elapsed()
    }

    /// Wait until the deadline passes.
    ///
    /// Cancel safe: dropping the future leaves the timer armed.
    pub async fn fired(&mut self) {
        if !self.fired {
            self.sleep.as_mut().await;
            self.fired = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let start = Instant::now();
        let mut timer = FlushTimer::new(Duration::from_millis(50));
        assert!(!timer.has_fired());
        assert_eq!(timer.deadline(), start + Duration::from_millis(50));

        timer.fired().await;

        assert!(timer.has_fired());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_fired() {
        let mut timer = FlushTimer::new(Duration::from_millis(10));
        timer.fired().await;
        let after_first = Instant::now();

        timer.fired().await;
        assert_eq!(Instant::now(), after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_timer_armed() {
        let mut timer = FlushTimer::new(Duration::from_millis(100));

        let early = tokio::time::timeout(Duration::from_millis(20), timer.fired()).await;
        assert!(early.is_err());
        assert!(!timer.has_fired());

        timer.fired().await;
        assert!(timer.has_fired());
    }
}
