//! Readiness Polling
//!
//! Bounded wait for a condition that flips asynchronously, such as a
//! transport handle finishing its connect handshake.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Poll step and overall bound for a readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoll {
    pub step: Duration,
    pub timeout: Duration,
}

impl Default for ReadinessPoll {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        }
    }
}

impl ReadinessPoll {
    pub fn new(step: Duration, timeout: Duration) -> Self {
        Self { step, timeout }
    }

    /// Wait until `ready()` returns true or the timeout elapses
    ///
    /// # Returns
    /// `true` if the condition held before the deadline
    pub async fn wait<F>(&self, mut ready: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            if ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.step.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately() {
        let start = Instant::now();
        assert!(ReadinessPoll::default().wait(|| true).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_polls() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let ready = ReadinessPoll::default()
            .wait(|| calls.fetch_add(1, Ordering::SeqCst) >= 3)
            .await;
        assert!(ready);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let start = Instant::now();
        assert!(!ReadinessPoll::default().wait(|| false).await);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }
}
