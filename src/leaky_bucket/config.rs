//! # Leaky Bucket Configuration
//!
//! Everything a [`LeakyBucket`](crate::LeakyBucket) needs to know before its drip
//! thread starts. A configuration is a plain value: build it, validate it, hand it
//! to the limiter. Nothing here can be changed once the limiter is running.
//!
//! ## Drip Policies
//!
//! A limiter is described by `rate` units per `per` duration. There are two ways
//! to drain those units out of the bucket:
//!
//! ```text
//!     rate = 5, per = 1s
//!
//!     Smooth:  ─┬────┬────┬────┬────┬──►  -1 every 200ms
//!               200  400  600  800  1000
//!
//!     Batch:   ──────────────────────┬──►  -5 every 1s
//!                                    1000
//! ```
//!
//! Both drain `rate` units per `per`. They differ in how quickly a full bucket
//! starts admitting again: `Smooth` frees one slot after `per / rate`, `Batch`
//! frees `rate` slots at once after `per`.

use super::error::{Error, Result};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Bucket capacity used when none is configured.
pub const DEFAULT_THRESHOLD: u64 = 100;

/// Memory ordering strategy for the bucket's atomics.
///
/// - `Relaxed`: cheapest; the level stays exact but other memory is not ordered
///   with it
/// - `AcquireRelease` (default): admissions and drips synchronize with each other
/// - `Sequential`: a single total order over every access, mostly for debugging
///
/// ```rust
/// use drip::{LeakyBucketConfig, MemoryOrdering};
/// use std::time::Duration;
///
/// let config = LeakyBucketConfig::new(100, Duration::from_secs(1))
///     .with_ordering(MemoryOrdering::Sequential);
/// assert_eq!(config.ordering, MemoryOrdering::Sequential);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrdering {
    /// Relaxed ordering on every access.
    Relaxed,

    /// Acquire loads, acquire-release CAS.
    #[default]
    AcquireRelease,

    /// Sequentially consistent ordering on every access.
    Sequential,
}

impl MemoryOrdering {
    /// Ordering for plain loads.
    #[inline(always)]
    pub(crate) fn load(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Acquire,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    /// Ordering for the success side of a CAS and for `fetch_*` operations.
    #[inline(always)]
    pub(crate) fn rmw(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::AcqRel,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    /// Ordering for the failure side of a CAS.
    #[inline(always)]
    pub(crate) fn cas_failure(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Acquire,
            Self::Sequential => Ordering::SeqCst,
        }
    }
}

/// How the configured rate is turned into drip ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DripPolicy {
    /// One unit every `per / rate`.
    #[default]
    Smooth,

    /// `rate` units every `per`.
    Batch,
}

/// Configuration for a [`LeakyBucket`](crate::LeakyBucket).
///
/// ## Examples
///
/// ```rust
/// use drip::{DripPolicy, LeakyBucketConfig};
/// use std::time::Duration;
///
/// // 5 units per second, drained one at a time every 200ms
/// let config = LeakyBucketConfig::new(5, Duration::from_secs(1));
/// assert_eq!(config.drip_interval(), Duration::from_millis(200));
/// assert_eq!(config.drip_amount(), 1);
///
/// // Same rate, drained in one batch of 5 every second
/// let batch = config.clone().with_policy(DripPolicy::Batch);
/// assert_eq!(batch.drip_interval(), Duration::from_secs(1));
/// assert_eq!(batch.drip_amount(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakyBucketConfig {
    /// Units drained per `per`. Must be greater than zero.
    pub rate: u32,

    /// The window `rate` is measured over. Must be greater than zero.
    pub per: Duration,

    /// Maximum bucket level. Admissions are rejected once it is reached.
    pub threshold: u64,

    /// How `rate` and `per` become drip ticks.
    pub policy: DripPolicy,

    /// Memory ordering for the bucket's atomics.
    pub ordering: MemoryOrdering,

    /// Number of recent admission decisions to keep. Zero disables the log.
    pub request_log_capacity: usize,
}

impl Default for LeakyBucketConfig {
    /// 10 units per second, threshold 100, smooth drip, no request log.
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}

impl LeakyBucketConfig {
    /// Creates a configuration draining `rate` units every `per`.
    ///
    /// Everything else takes its default: threshold [`DEFAULT_THRESHOLD`],
    /// [`DripPolicy::Smooth`], [`MemoryOrdering::AcquireRelease`], no request log.
    pub fn new(rate: u32, per: Duration) -> Self {
        Self {
            rate,
            per,
            threshold: DEFAULT_THRESHOLD,
            policy: DripPolicy::default(),
            ordering: MemoryOrdering::default(),
            request_log_capacity: 0,
        }
    }

    /// `rate` units per second.
    pub fn per_second(rate: u32) -> Self {
        Self::new(rate, Duration::from_secs(1))
    }

    /// `rate` units per minute.
    pub fn per_minute(rate: u32) -> Self {
        Self::new(rate, Duration::from_secs(60))
    }

    /// Sets the bucket capacity.
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the drip policy.
    pub fn with_policy(mut self, policy: DripPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the memory ordering strategy.
    pub fn with_ordering(mut self, ordering: MemoryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Keeps the last `capacity` admission decisions in a ring buffer.
    ///
    /// See [`LeakyBucket::recent_requests`](crate::LeakyBucket::recent_requests).
    pub fn with_request_log(mut self, capacity: usize) -> Self {
        self.request_log_capacity = capacity;
        self
    }

    /// Time between two drips.
    ///
    /// `per / rate` under [`DripPolicy::Smooth`], `per` under [`DripPolicy::Batch`].
    /// Returns [`Duration::ZERO`] when `rate` is zero; `validate` rejects that.
    pub fn drip_interval(&self) -> Duration {
        match self.policy {
            DripPolicy::Smooth if self.rate == 0 => Duration::ZERO,
            DripPolicy::Smooth => self.per / self.rate,
            DripPolicy::Batch => self.per,
        }
    }

    /// Units removed from the bucket on every drip.
    pub fn drip_amount(&self) -> u64 {
        match self.policy {
            DripPolicy::Smooth => 1,
            DripPolicy::Batch => self.rate as u64,
        }
    }

    /// Checks the configuration before a limiter is built from it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] if:
    /// - `rate` is 0
    /// - `per` is zero
    /// - `threshold` is 0
    /// - the drip interval comes out as zero (`per / rate` below one nanosecond)
    ///
    /// ```rust
    /// use drip::LeakyBucketConfig;
    /// use std::time::Duration;
    ///
    /// assert!(LeakyBucketConfig::new(0, Duration::from_secs(1)).validate().is_err());
    /// assert!(LeakyBucketConfig::new(5, Duration::ZERO).validate().is_err());
    /// assert!(LeakyBucketConfig::new(5, Duration::from_secs(1)).validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.rate == 0 {
            return Err(Error::InvalidConfiguration("rate must be greater than 0"));
        }
        if self.per.is_zero() {
            return Err(Error::InvalidConfiguration("per must be greater than 0"));
        }
        if self.threshold == 0 {
            return Err(Error::InvalidConfiguration(
                "threshold must be greater than 0",
            ));
        }
        if self.drip_interval().is_zero() {
            return Err(Error::InvalidConfiguration(
                "drip interval rounds down to zero; lower the rate or raise per",
            ));
        }
        Ok(())
    }

    /// Units drained per second, for display.
    ///
    /// ```rust
    /// use drip::LeakyBucketConfig;
    /// use std::time::Duration;
    ///
    /// let config = LeakyBucketConfig::new(30, Duration::from_secs(60));
    /// assert_eq!(config.effective_rate_per_second(), 0.5);
    /// ```
    pub fn effective_rate_per_second(&self) -> f64 {
        let secs = self.per.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rate as f64 / secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(config: &LeakyBucketConfig) -> &'static str {
        match config.validate() {
            Err(Error::InvalidConfiguration(reason)) => reason,
            other => panic!("expected InvalidConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_memory_ordering() {
        let ordering = MemoryOrdering::AcquireRelease;
        assert_eq!(ordering.load(), Ordering::Acquire);
        assert_eq!(ordering.rmw(), Ordering::AcqRel);
        assert_eq!(ordering.cas_failure(), Ordering::Acquire);

        let relaxed = MemoryOrdering::Relaxed;
        assert_eq!(relaxed.load(), Ordering::Relaxed);
        assert_eq!(relaxed.rmw(), Ordering::Relaxed);

        let sequential = MemoryOrdering::Sequential;
        assert_eq!(sequential.load(), Ordering::SeqCst);
        assert_eq!(sequential.cas_failure(), Ordering::SeqCst);
    }

    #[test]
    fn test_defaults() {
        let config = LeakyBucketConfig::default();
        assert_eq!(config.rate, 10);
        assert_eq!(config.per, Duration::from_secs(1));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.policy, DripPolicy::Smooth);
        assert_eq!(config.ordering, MemoryOrdering::AcquireRelease);
        assert_eq!(config.request_log_capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_smooth_policy_derivation() {
        let config = LeakyBucketConfig::new(5, Duration::from_secs(1));
        assert_eq!(config.drip_interval(), Duration::from_millis(200));
        assert_eq!(config.drip_amount(), 1);
    }

    #[test]
    fn test_batch_policy_derivation() {
        let config =
            LeakyBucketConfig::new(5, Duration::from_secs(12)).with_policy(DripPolicy::Batch);
        assert_eq!(config.drip_interval(), Duration::from_secs(12));
        assert_eq!(config.drip_amount(), 5);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = LeakyBucketConfig::new(0, Duration::from_secs(1));
        assert_eq!(config.drip_interval(), Duration::ZERO);
        assert_eq!(reason(&config), "rate must be greater than 0");

        let batch = config.with_policy(DripPolicy::Batch);
        assert_eq!(reason(&batch), "rate must be greater than 0");
    }

    #[test]
    fn test_zero_per_rejected() {
        let config = LeakyBucketConfig::new(5, Duration::ZERO);
        assert_eq!(reason(&config), "per must be greater than 0");
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = LeakyBucketConfig::per_second(5).with_threshold(0);
        assert_eq!(reason(&config), "threshold must be greater than 0");
    }

    #[test]
    fn test_sub_nanosecond_interval_rejected() {
        // 1000 units per nanosecond would need a sub-nanosecond tick
        let config = LeakyBucketConfig::new(1000, Duration::from_nanos(1));
        assert!(reason(&config).starts_with("drip interval"));

        // Batch drains the same rate in one go, so it stays valid
        let batch = config.with_policy(DripPolicy::Batch);
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = LeakyBucketConfig::per_minute(120)
            .with_threshold(40)
            .with_policy(DripPolicy::Batch)
            .with_ordering(MemoryOrdering::Relaxed)
            .with_request_log(16);

        assert_eq!(config.per, Duration::from_secs(60));
        assert_eq!(config.threshold, 40);
        assert_eq!(config.policy, DripPolicy::Batch);
        assert_eq!(config.ordering, MemoryOrdering::Relaxed);
        assert_eq!(config.request_log_capacity, 16);
        assert_eq!(config.effective_rate_per_second(), 2.0);
    }

    #[test]
    fn test_effective_rate_with_zero_per() {
        let config = LeakyBucketConfig::new(5, Duration::ZERO);
        assert_eq!(config.effective_rate_per_second(), 0.0);
    }
}
