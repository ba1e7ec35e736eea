//! Fixed-delay throttle applied before every outgoing probe.
//!
//! Also counts how many requests it let through, which the engine reports
//! at the end of a scan.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use tokio::time::{sleep, Duration};

pub struct ThrottleController {
    delay: Duration,
    total_requests: AtomicU64,
}

impl ThrottleController {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            total_requests: AtomicU64::new(0),
        }
    }

    /// Builds a throttle from a delay in (possibly fractional) seconds.
    /// Negative, NaN or unrepresentably large values mean no delay.
    pub fn from_secs_f64(seconds: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO))
    }

    /// Sleeps for the configured delay. No-op when delay is 0.
    pub async fn wait(&self) {
        self.total_requests.fetch_add(1, Relaxed);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_delays_clamp_to_zero() {
        assert_eq!(ThrottleController::from_secs_f64(-1.0).delay(), Duration::ZERO);
        assert_eq!(ThrottleController::from_secs_f64(f64::NAN).delay(), Duration::ZERO);
        assert_eq!(ThrottleController::from_secs_f64(f64::INFINITY).delay(), Duration::ZERO);
        assert_eq!(ThrottleController::from_secs_f64(1e30).delay(), Duration::ZERO);
        assert_eq!(ThrottleController::from_secs_f64(0.5).delay(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_and_counts() {
        let throttle = ThrottleController::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert_eq!(throttle.total_requests(), 2);
    }
}
