//! Randomized, linearly growing poll backoff.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Wait strategy used between empty reads.
///
/// Every consecutive empty read grows the interval by a jitter drawn
/// uniformly from `[0, base)`. Tails polling the same file drift apart
/// instead of waking in lock-step. Any successful read resets the interval
/// to `base`.
#[derive(Debug)]
pub struct Backoff<R = StdRng> {
    base: Duration,
    max: Duration,
    current: Duration,
    rng: R,
}

impl Backoff<StdRng> {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self::with_rng(base, max, StdRng::from_os_rng())
    }
}

impl<R: Rng> Backoff<R> {
    /// Creates a backoff drawing its jitter from `rng`.
    pub fn with_rng(base: Duration, max: Duration, rng: R) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
            rng,
        }
    }

    /// Grows the interval and returns how long to wait before the next read.
    pub fn next_delay(&mut self) -> Duration {
        let jitter = self.base.mul_f64(self.rng.random::<f64>());
        self.current = (self.current + jitter).min(self.max);
        self.current
    }

    /// Back to the floor after the file produced data.
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}
