//! Time source for the simulator.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Wall clock and sleep used for timestamps and simulated work.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Real time via `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock that only moves when slept on or advanced.
///
/// `sleep` advances the virtual time by the full duration and yields once,
/// so runs complete immediately while timestamps and durations still
/// reflect the simulated delays.
#[derive(Debug)]
pub struct VirtualClock {
    start: DateTime<Utc>,
    now: Mutex<DateTime<Utc>>,
}

impl VirtualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            now: Mutex::new(start),
        }
    }

    /// Moves virtual time forward.
    pub fn advance(&self, duration: Duration) {
        let delta = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }

    /// Virtual time elapsed since construction.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        self.now() - self.start
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn virtual_sleep_advances_time() {
        let clock = VirtualClock::default();
        clock.sleep(Duration::from_millis(800)).await;
        clock.sleep(Duration::from_millis(1200)).await;
        assert_eq!(clock.elapsed(), TimeDelta::milliseconds(2000));
    }
}
