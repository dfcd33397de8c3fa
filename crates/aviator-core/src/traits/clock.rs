// # Clock Trait
//
// Time source for the poll loop, the cycle delays and the date bucket.
//
// Injected so tests can run whole cycles without real delays: a manual clock
// advances its virtual time on `sleep()` and returns immediately.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::Instant;

/// Trait for time sources
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Suspend the current cycle for `duration`
    async fn sleep(&self, duration: Duration);

    /// Current local calendar date (not UTC)
    fn today(&self) -> NaiveDate;

    /// Time elapsed since `start`
    fn elapsed_since(&self, start: Instant) -> Duration {
        self.now().saturating_duration_since(start)
    }
}

/// Wall-clock implementation backed by tokio time and the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_sleep_advances_time() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::from_millis(700)).await;

        assert!(clock.elapsed_since(start) >= Duration::from_millis(700));
    }

    #[test]
    fn test_system_clock_today_is_local() {
        assert_eq!(SystemClock.today(), chrono::Local::now().date_naive());
    }
}
