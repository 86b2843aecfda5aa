//! # Bucket State
//!
//! The shared counter at the centre of the limiter. Admissions pour units in,
//! the drip thread lets them leak out:
//!
//! ```text
//!     allow() ──► +1 ┐
//!                    ▼
//!              ┌───────────┐  threshold (100)
//!              │           │
//!              │▓▓▓▓▓▓▓▓▓▓▓│  level (42)
//!              │▓▓▓▓▓▓▓▓▓▓▓│
//!              └─────┬─────┘
//!                    ▼
//!              drip() ──► -drip_amount every drip_interval, floor 0
//! ```
//!
//! Every change to the level is a single compare-and-swap, so concurrent
//! admissions and drips never lose updates and an admission can never push the
//! level past what its predicate allowed.

use super::{
    config::{LeakyBucketConfig, MemoryOrdering},
    utils::{Backoff, CacheAligned},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counter, capacity and drip parameters of one leaky bucket.
///
/// Owned by a [`LeakyBucket`](crate::LeakyBucket) and shared with its drip
/// thread. The public surface is read-only; only the limiter mutates it.
pub struct BucketState {
    /// Current level, on its own cache line.
    level: CacheAligned<AtomicU64>,

    threshold: u64,
    drip_amount: u64,
    drip_interval: Duration,
    ordering: MemoryOrdering,

    total_drips: AtomicU64,
    total_drained: AtomicU64,
}

impl BucketState {
    /// Creates an empty bucket from an already validated configuration.
    pub(crate) fn new(config: &LeakyBucketConfig) -> Self {
        Self {
            level: CacheAligned::new(AtomicU64::new(0)),
            threshold: config.threshold,
            drip_amount: config.drip_amount(),
            drip_interval: config.drip_interval(),
            ordering: config.ordering,
            total_drips: AtomicU64::new(0),
            total_drained: AtomicU64::new(0),
        }
    }

    /// Current level (units admitted and not yet drained).
    #[inline]
    pub fn level(&self) -> u64 {
        self.level.0.load(self.ordering.load())
    }

    /// Maximum level.
    #[inline]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Units removed per drip.
    #[inline]
    pub fn drip_amount(&self) -> u64 {
        self.drip_amount
    }

    /// Time between drips.
    #[inline]
    pub fn drip_interval(&self) -> Duration {
        self.drip_interval
    }

    /// Room left before the threshold.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.threshold.saturating_sub(self.level())
    }

    /// Number of drip ticks processed, including ticks on an empty bucket.
    pub fn total_drips(&self) -> u64 {
        self.total_drips.load(Ordering::Relaxed)
    }

    /// Total units removed by drips.
    pub fn total_drained(&self) -> u64 {
        self.total_drained.load(Ordering::Relaxed)
    }

    /// Adds `size` units if `admit(level)` holds for the level the CAS lands on.
    ///
    /// The predicate is re-evaluated against every freshly observed level, so a
    /// concurrent admission or drip between the check and the write just costs
    /// a retry. Like `compare_exchange`, returns `Ok` with the level after the
    /// admission, or `Err` with the level the rejection was judged against.
    #[inline]
    pub(crate) fn try_fill<F>(&self, size: u64, admit: F) -> Result<u64, u64>
    where
        F: Fn(u64) -> bool,
    {
        let mut backoff = Backoff::new();
        let mut current = self.level.0.load(self.ordering.load());

        loop {
            if !admit(current) {
                return Err(current);
            }
            let next = current.checked_add(size).ok_or(current)?;

            match self.level.0.compare_exchange_weak(
                current,
                next,
                self.ordering.rmw(),
                self.ordering.cas_failure(),
            ) {
                Ok(_) => return Ok(next),
                Err(actual) => {
                    current = actual;
                    backoff.snooze();
                }
            }
        }
    }

    /// Capacity-gated admission of a single unit: `level < threshold`.
    #[inline]
    pub(crate) fn fill_one(&self) -> Result<u64, u64> {
        let threshold = self.threshold;
        self.try_fill(1, |level| level < threshold)
    }

    /// Sized admission: `level + size < threshold`.
    #[inline]
    pub(crate) fn fill_sized(&self, size: u64) -> Result<u64, u64> {
        let threshold = self.threshold;
        self.try_fill(size, |level| {
            level.checked_add(size).map_or(false, |next| next < threshold)
        })
    }

    /// Removes one drip's worth of units, clamping at zero.
    ///
    /// Returns the number of units actually removed.
    pub(crate) fn drip(&self) -> u64 {
        let mut backoff = Backoff::new();
        let mut current = self.level.0.load(self.ordering.load());

        let drained = loop {
            if current == 0 {
                break 0;
            }
            let next = current.saturating_sub(self.drip_amount);

            match self.level.0.compare_exchange_weak(
                current,
                next,
                self.ordering.rmw(),
                self.ordering.cas_failure(),
            ) {
                Ok(_) => break current - next,
                Err(actual) => {
                    current = actual;
                    backoff.snooze();
                }
            }
        };

        self.total_drips.fetch_add(1, Ordering::Relaxed);
        if drained > 0 {
            self.total_drained.fetch_add(drained, Ordering::Relaxed);
        }
        drained
    }
}

impl std::fmt::Debug for BucketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketState")
            .field("level", &self.level())
            .field("threshold", &self.threshold)
            .field("drip_amount", &self.drip_amount)
            .field("drip_interval", &self.drip_interval)
            .finish()
    }
}
