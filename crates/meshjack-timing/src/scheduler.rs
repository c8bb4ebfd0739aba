//! Burst Scheduler
//!
//! A burst is N sequential sends with a fixed pause between consecutive
//! sends (none after the last). Bursts observe a cancellation token between
//! sends so a session can stop mid-burst.
//!
//! ```text
//! send(0) --delay-- send(1) --delay-- ... send(N-1)
//! ```
//!
//! A [`Ticker`] repeats a unit of work at a fixed interval until cancelled.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::errors::{TimingError, TimingResult};

/// Sleep for `duration` unless the token fires first
///
/// # Returns
/// `true` if the full duration elapsed, `false` if cancelled
pub async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

/// Count and pacing of a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    count: u32,
    delay: Duration,
}

impl Burst {
    /// Create a burst
    ///
    /// # Arguments
    /// * `count` - number of sends, at least 1
    /// * `delay` - pause between consecutive sends
    pub fn new(count: u32, delay: Duration) -> TimingResult<Self> {
        if count == 0 {
            return Err(TimingError::InvalidConfig("burst count must be at least 1".into()));
        }
        Ok(Self { count, delay })
    }

    /// Single send, no pause (direct spoofing and one-off commands)
    pub fn direct() -> Self {
        Self {
            count: 1,
            delay: Duration::ZERO,
        }
    }

    /// Default reassertion burst: 5 sends, 2 s apart
    pub fn reactive() -> Self {
        Self {
            count: 5,
            delay: Duration::from_secs(2),
        }
    }

    /// Default periodic burst: 1 send, 1 s pause
    pub fn periodic() -> Self {
        Self {
            count: 1,
            delay: Duration::from_secs(1),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total wall time spent pausing inside the burst
    pub fn span(&self) -> Duration {
        self.delay * self.count.saturating_sub(1)
    }

    /// Run the burst, calling `send` with each send index
    ///
    /// Stops early when `cancel` fires during a pause.
    ///
    /// # Returns
    /// Number of sends performed
    pub async fn run<F, Fut>(&self, cancel: &CancellationToken, mut send: F) -> u32
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut sent = 0;
        for index in 0..self.count {
            if cancel.is_cancelled() {
                break;
            }
            send(index).await;
            sent += 1;
            if index + 1 < self.count && !sleep_unless_cancelled(self.delay, cancel).await {
                break;
            }
        }
        sent
    }
}

/// Fixed-interval repetition: fire, wait `interval`, fire again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    interval: Duration,
}

impl Ticker {
    pub fn new(interval: Duration) -> TimingResult<Self> {
        if interval.is_zero() {
            return Err(TimingError::InvalidConfig("interval cannot be zero".into()));
        }
        Ok(Self { interval })
    }

    /// Periodic announcement interval: 60 s
    pub fn periodic() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Call `tick` immediately and then once per interval until cancelled
    ///
    /// A tick in progress is allowed to finish; the interval is measured
    /// from the end of one tick to the start of the next.
    ///
    /// # Returns
    /// Number of ticks performed
    pub async fn run<F, Fut>(&self, cancel: &CancellationToken, mut tick: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut ticks = 0;
        while !cancel.is_cancelled() {
            tick(ticks).await;
            ticks += 1;
            if !sleep_unless_cancelled(self.interval, cancel).await {
                break;
            }
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_presets() {
        assert_eq!(Burst::direct().count(), 1);
        assert_eq!(Burst::direct().delay(), Duration::ZERO);
        assert_eq!(Burst::reactive().count(), 5);
        assert_eq!(Burst::reactive().delay(), Duration::from_secs(2));
        assert_eq!(Burst::periodic().delay(), Duration::from_secs(1));
        assert_eq!(Burst::reactive().span(), Duration::from_secs(8));
        assert_eq!(Ticker::periodic().interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(Burst::new(0, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_pacing() {
        let burst = Burst::new(3, Duration::from_secs(2)).unwrap();
        let cancel = CancellationToken::new();
        let start = Instant::now();
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let sent = burst
            .run(&cancel, |i| {
                let stamps = Arc::clone(&stamps);
                async move {
                    stamps.lock().unwrap().push((i, start.elapsed()));
                }
            })
            .await;

        assert_eq!(sent, 3);
        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps[0], (0, Duration::ZERO));
        assert_eq!(stamps[1].1, Duration::from_secs(2));
        assert_eq!(stamps[2].1, Duration::from_secs(4));
        // No pause after the last send
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_cancelled_mid_pause() {
        let burst = Burst::new(5, Duration::from_secs(10)).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(15)).await;
            trigger.cancel();
        });

        let sent = burst.run(&cancel, |_| async {}).await;
        assert_eq!(sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_runs_until_cancelled() {
        let ticker = Ticker::new(Duration::from_secs(60)).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(150)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let ticks = ticker.run(&cancel, |_| async {}).await;
        // t = 0, 60, 120
        assert_eq!(ticks, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(150));
        assert!(Ticker::new(Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_unless_cancelled() {
        let cancel = CancellationToken::new();
        assert!(sleep_unless_cancelled(Duration::from_secs(1), &cancel).await);
        cancel.cancel();
        assert!(!sleep_unless_cancelled(Duration::from_secs(1), &cancel).await);
    }
}
