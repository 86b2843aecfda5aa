//! # drip - Leaky Bucket Rate Limiting
//!
//! A thread-safe leaky-bucket rate limiter. Admitted work pours into a bucket
//! of fixed capacity; a background thread lets it leak out at a steady rate.
//! When the bucket is full, new work is rejected until enough has drained.
//!
//! ```text
//!     Leaky Bucket:
//!
//!        allow() ─► ▼ ▼ ▼
//!                 ┌───────┐ ◄── threshold
//!                 │       │
//!                 │▓▓▓▓▓▓▓│ ◄── level
//!                 │▓▓▓▓▓▓▓│
//!                 └───┬───┘
//!                     ▼  drip: -amount every interval
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use drip::LeakyBucket;
//! use std::time::Duration;
//!
//! // Drain 5 units per second, hold at most 100
//! let limiter = LeakyBucket::new(5, Duration::from_secs(1))?;
//!
//! if limiter.allow() {
//!     // handle the request
//! } else {
//!     // reject or retry later
//! }
//!
//! limiter.shutdown();
//! # Ok::<(), drip::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! - Every admission and every drip is one compare-and-swap on the level, so
//!   the level never exceeds the threshold no matter how many threads call
//!   [`LeakyBucket::allow`] at once
//! - [`LeakyBucket::stop`] is idempotent and never blocks;
//!   [`LeakyBucket::shutdown`] also joins the drip thread, and dropping the
//!   limiter does the same
//! - A stopped limiter rejects every request
//!
//! ## Companion Ring Buffer
//!
//! [`RingBuffer`] is a fixed-capacity FIFO that overwrites its oldest entry.
//! The limiter can keep its recent decisions in one; see
//! [`LeakyBucketConfig::with_request_log`].
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (drip thread lifecycle at `info`,
//! drained units at `debug`) and never installs a subscriber itself.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod leaky_bucket;
mod ring_buffer;

pub use leaky_bucket::{
    cpu_relax, current_time_ms, AdmissionRecord, BucketState, DripPolicy, Error, HealthStatus,
    LeakyBucket, LeakyBucketConfig, LimiterMetrics, LimiterState, MemoryOrdering, Result,
    DEFAULT_THRESHOLD,
};
pub use ring_buffer::RingBuffer;

use std::time::Duration;

/// A limiter in an `Arc`, ready to be cloned into worker threads.
///
/// ```rust
/// use drip::{LeakyBucket, SharedLeakyBucket};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let shared: SharedLeakyBucket = Arc::new(LeakyBucket::new(10, Duration::from_secs(1))?);
/// let worker = shared.clone();
/// std::thread::spawn(move || worker.allow()).join().unwrap();
/// # Ok::<(), drip::Error>(())
/// ```
pub type SharedLeakyBucket = std::sync::Arc<LeakyBucket>;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports.
///
/// ```rust
/// use drip::prelude::*;
///
/// let config = LeakyBucketConfig::per_second(20).with_policy(DripPolicy::Batch);
/// let limiter = LeakyBucket::with_config(config)?;
/// assert_eq!(limiter.state(), LimiterState::Running);
/// # Ok::<(), drip::Error>(())
/// ```
pub mod prelude {
    pub use crate::{
        DripPolicy, Error, HealthStatus, LeakyBucket, LeakyBucketBuilder, LeakyBucketConfig,
        LimiterMetrics, LimiterState, MemoryOrdering, RingBuffer, SharedLeakyBucket,
    };
}

/// Fluent construction of a [`LeakyBucket`].
///
/// ```rust
/// use drip::{DripPolicy, LeakyBucketBuilder};
/// use std::time::Duration;
///
/// let limiter = LeakyBucketBuilder::new()
///     .rate(5)
///     .per(Duration::from_secs(1))
///     .threshold(20)
///     .policy(DripPolicy::Batch)
///     .request_log(64)
///     .build()?;
///
/// assert_eq!(limiter.threshold(), 20);
/// assert_eq!(limiter.drip_amount(), 5);
///
/// // Invalid settings surface from build()
/// assert!(LeakyBucketBuilder::new().rate(0).build().is_err());
/// # Ok::<(), drip::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct LeakyBucketBuilder {
    config: LeakyBucketConfig,
}

impl LeakyBucketBuilder {
    /// Starts from [`LeakyBucketConfig::default`].
    pub fn new() -> Self {
        Self {
            config: LeakyBucketConfig::default(),
        }
    }

    /// Units drained per `per` window.
    pub fn rate(mut self, rate: u32) -> Self {
        self.config.rate = rate;
        self
    }

    /// Length of the window `rate` is measured over.
    pub fn per(mut self, per: Duration) -> Self {
        self.config.per = per;
        self
    }

    /// Bucket capacity.
    pub fn threshold(mut self, threshold: u64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Drip policy.
    pub fn policy(mut self, policy: DripPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Memory ordering for the bucket's atomics.
    pub fn memory_ordering(mut self, ordering: MemoryOrdering) -> Self {
        self.config.ordering = ordering;
        self
    }

    /// Keep the last `capacity` admission decisions.
    pub fn request_log(mut self, capacity: usize) -> Self {
        self.config.request_log_capacity = capacity;
        self
    }

    /// Validates the configuration and starts the limiter.
    ///
    /// # Errors
    ///
    /// See [`LeakyBucket::with_config`].
    pub fn build(self) -> Result<LeakyBucket> {
        LeakyBucket::with_config(self.config)
    }
}

impl Default for LeakyBucketBuilder {
    fn default() -> Self {
        Self::new()
    }
}
