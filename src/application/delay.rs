//! Injectable waits used by the debug simulation.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Blocking-style pause on the render path.
///
/// Implementations must be cancellable by dropping the returned future.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Real wall-clock delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately; for tests and benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn pause(&self, _duration: Duration) {}
}

/// Inclusive range the simulated network jitter is drawn from.
///
/// Samples are even millisecond counts: `rand(min/2, max/2) * 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugJitter {
    min_ms: u64,
    max_ms: u64,
}

impl DebugJitter {
    pub const DEFAULT_MIN_MS: u64 = 250;
    pub const DEFAULT_MAX_MS: u64 = 350;

    /// Returns `None` when `min_ms > max_ms`.
    pub fn new(min_ms: u64, max_ms: u64) -> Option<Self> {
        (min_ms <= max_ms).then_some(Self { min_ms, max_ms })
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    pub fn sample(&self) -> Duration {
        let low = self.min_ms.div_ceil(2);
        let high = self.max_ms / 2;
        if low > high {
            // No even value inside the window.
            return Duration::from_millis(self.min_ms);
        }
        let halves = rand::rng().random_range(low..=high);
        Duration::from_millis(halves * 2)
    }
}

impl Default for DebugJitter {
    fn default() -> Self {
        Self {
            min_ms: Self::DEFAULT_MIN_MS,
            max_ms: Self::DEFAULT_MAX_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_jitter_stays_within_window() {
        let jitter = DebugJitter::default();
        for _ in 0..200 {
            let ms = jitter.sample().as_millis() as u64;
            assert!((250..=350).contains(&ms), "{ms} outside window");
            assert_eq!(ms % 2, 0);
        }
    }

    #[test]
    fn degenerate_ranges_are_fixed_or_rejected() {
        assert_eq!(
            DebugJitter::new(100, 100).unwrap().sample(),
            Duration::from_millis(100)
        );
        assert!(DebugJitter::new(10, 5).is_none());
    }

    #[tokio::test]
    async fn no_delay_returns_immediately() {
        let started = std::time::Instant::now();
        NoDelay.pause(Duration::from_secs(10)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
