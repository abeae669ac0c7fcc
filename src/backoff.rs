//! Adaptive wait for external readiness
//!
//! [`Backoff`] is the slowest of three progress tiers, after a direct system
//! call and a local hardware spin: a software sleep for callers that saw a
//! would-block and must wait for something outside the process. The copy
//! engine never calls it; callers do.
//!
//! Waits are grouped into blocks. Block `k` performs `k` sleeps of
//! `min(k * base, max)` each, with ±12.5% jitter so independent callers do
//! not wake in lockstep.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default base duration, on the scale of a local network round trip
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_micros(500);

/// Default ceiling for a single wait
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(100);

/// Block-wise linear backoff with jitter
///
/// A default-constructed value is ready to use. The jitter generator is
/// seeded from the system clock on first use unless a seed was given with
/// [`Backoff::with_seed`].
///
/// Not meant to be shared between operations in flight at the same time:
/// it carries the progress of one wait sequence.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    /// Block index, 1-based; 0 until first use
    block: u32,
    /// Waits already performed in the current block
    iteration: u32,
    base: Duration,
    max: Duration,
    /// Xorshift state; 0 until seeded
    rng: u64,
}

impl Backoff {
    /// Backoff with default base and ceiling
    #[must_use]
    pub const fn new() -> Self {
        Self {
            block: 0,
            iteration: 0,
            base: Duration::ZERO,
            max: Duration::ZERO,
            rng: 0,
        }
    }

    /// Backoff with deterministic jitter
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        let mut backoff = Self::new();
        backoff.rng = seed | 1;
        backoff
    }

    /// Set the base duration; zero selects [`DEFAULT_BACKOFF_BASE`]
    #[must_use]
    pub const fn with_base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    /// Set the ceiling; zero selects [`DEFAULT_BACKOFF_MAX`]
    #[must_use]
    pub const fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Set the base duration; zero selects [`DEFAULT_BACKOFF_BASE`]
    pub fn set_base(&mut self, base: Duration) {
        self.base = base;
    }

    /// Set the ceiling; zero selects [`DEFAULT_BACKOFF_MAX`]
    pub fn set_max(&mut self, max: Duration) {
        self.max = max;
    }

    /// Sleep for the next jittered duration and advance
    pub fn wait(&mut self) {
        let delay = self.next_delay();
        std::thread::sleep(delay);
    }

    /// Compute the next jittered duration and advance, without sleeping
    ///
    /// For callers that arm their own timer instead of blocking the thread.
    pub fn next_delay(&mut self) -> Duration {
        if self.block == 0 {
            self.block = 1;
            self.iteration = 0;
        }
        if self.rng == 0 {
            self.rng = clock_seed();
        }

        let delay = self.jitter(self.current_duration());
        tracing::trace!(block = self.block, ?delay, "backoff");

        self.iteration += 1;
        if self.iteration >= self.block {
            self.iteration = 0;
            self.block = self.block.saturating_add(1);
        }
        delay
    }

    /// Return to block 1, typically after a productive operation
    pub fn reset(&mut self) {
        self.block = 0;
        self.iteration = 0;
    }

    /// Block the next wait belongs to
    #[must_use]
    pub const fn current_block(&self) -> u32 {
        if self.block == 0 {
            1
        } else {
            self.block
        }
    }

    /// Duration of the next wait, before jitter
    #[must_use]
    pub fn current_duration(&self) -> Duration {
        let base = if self.base.is_zero() {
            DEFAULT_BACKOFF_BASE
        } else {
            self.base
        };
        let max = if self.max.is_zero() {
            DEFAULT_BACKOFF_MAX
        } else {
            self.max
        };
        base.saturating_mul(self.current_block()).min(max)
    }

    /// Scale `d` by a factor in [0.875, 1.125)
    fn jitter(&mut self, d: Duration) -> Duration {
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 7;
        self.rng ^= self.rng << 17;
        let r = i128::from((self.rng >> 32) % 256);
        let nanos = i128::try_from(d.as_nanos()).unwrap_or(i128::MAX / 1024);
        let jittered = nanos + nanos * (r - 128) / 1024;
        Duration::from_nanos(u64::try_from(jittered.max(0)).unwrap_or(u64::MAX))
    }
}

fn clock_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    // Truncation keeps the fast-moving low bits.
    #[allow(clippy::cast_possible_truncation)]
    let seed = nanos as u64;
    seed | 1
}
