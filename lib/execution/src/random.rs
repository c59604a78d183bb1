//! Randomness used for simulated node delays and failures.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub trait RandomSource: Send + Sync {
    /// A duration in `[min, max]`.
    fn delay_between(&self, min: Duration, max: Duration) -> Duration;

    /// Decides whether the next node fails, given a failure probability.
    fn should_fail(&self, probability: f64) -> bool;
}

fn sample_delay<R: Rng + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rng.random_range(min.as_millis()..=max.as_millis());
    Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX))
}

fn sample_failure<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    probability > 0.0 && rng.random::<f64>() < probability
}

/// Thread-local entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn delay_between(&self, min: Duration, max: Duration) -> Duration {
        sample_delay(&mut rand::rng(), min, max)
    }

    fn should_fail(&self, probability: f64) -> bool {
        sample_failure(&mut rand::rng(), probability)
    }
}

/// Reproducible sequence from a seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn delay_between(&self, min: Duration, max: Duration) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        sample_delay(&mut *rng, min, max)
    }

    fn should_fail(&self, probability: f64) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        sample_failure(&mut *rng, probability)
    }
}

/// Constant delay, with an optional failure on the n-th executed node.
///
/// The failure probability passed to [`RandomSource::should_fail`] is
/// ignored.
#[derive(Debug)]
pub struct FixedRandom {
    delay: Duration,
    fail_at: Option<usize>,
    calls: AtomicUsize,
}

impl FixedRandom {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails the node at zero-based position `index` among executed nodes.
    #[must_use]
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl RandomSource for FixedRandom {
    fn delay_between(&self, _min: Duration, _max: Duration) -> Duration {
        self.delay
    }

    fn should_fail(&self, _probability: f64) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.fail_at == Some(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_delays_are_reproducible_and_bounded() {
        let min = Duration::from_millis(800);
        let max = Duration::from_millis(2000);
        let a = SeededRandom::new(7);
        let b = SeededRandom::new(7);
        for _ in 0..20 {
            let d = a.delay_between(min, max);
            assert_eq!(d, b.delay_between(min, max));
            assert!(d >= min && d <= max);
        }
    }

    #[test]
    fn zero_probability_never_fails() {
        let random = ThreadRandom;
        assert!((0..100).all(|_| !random.should_fail(0.0)));
    }

    #[test]
    fn fixed_fails_only_at_index() {
        let random = FixedRandom::new(Duration::ZERO).failing_at(1);
        assert!(!random.should_fail(0.0));
        assert!(random.should_fail(0.0));
        assert!(!random.should_fail(0.0));
    }
}
