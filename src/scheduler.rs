//! Jittered delays between checks
//!
//! Actions sharing an interval would otherwise hit graphite in lockstep.
//! Every delay is the interval plus a uniformly drawn whole number of seconds
//! in `[0, max(1, interval / 10))`.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Exclusive upper bound, in seconds, of the jitter added to `interval_secs`
pub fn jitter_bound(interval_secs: u64) -> u64 {
    (interval_secs / 10).max(1)
}

/// Per-action source of jittered delays
///
/// Every action owns one, seeded independently from the OS.
#[derive(Debug)]
pub struct JitteredSchedule {
    interval_secs: u64,
    rng: StdRng,
}

impl JitteredSchedule {
    pub fn new(interval_secs: u64) -> Self {
        Self::with_rng(interval_secs, StdRng::from_os_rng())
    }

    /// Deterministic schedule for tests
    pub fn seeded(interval_secs: u64, seed: u64) -> Self {
        Self::with_rng(interval_secs, StdRng::seed_from_u64(seed))
    }

    fn with_rng(interval_secs: u64, rng: StdRng) -> Self {
        Self { interval_secs, rng }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Draw the delay before the next check
    pub fn next_delay(&mut self) -> Duration {
        let jitter = self.rng.random_range(0..jitter_bound(self.interval_secs));
        Duration::from_secs(self.interval_secs + jitter)
    }
}
