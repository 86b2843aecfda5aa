//! # Leaky Bucket Controller
//!
//! [`LeakyBucket`] ties a [`BucketState`] to the drip thread that drains it and
//! decides admissions against it.
//!
//! ## Lifecycle
//!
//! ```text
//!     new() ──► Running ──stop()──► Stopping ──thread exits──► Stopped
//!                  │                                              ▲
//!                  └───────────────shutdown() / drop──────────────┘
//!                                 (signals and joins)
//! ```
//!
//! Admissions are decided only while `Running`. Once stop has been signalled
//! the bucket no longer drains, so every further request is rejected instead
//! of being judged against a level that can only rise.
//!
//! ## Admission Rules
//!
//! - [`allow`](LeakyBucket::allow): admit one unit iff `level < threshold`
//! - [`allow_n`](LeakyBucket::allow_n): admit `size` units iff `level + size < threshold`
//!
//! Both are a single compare-and-swap on the level, so no interleaving of
//! admissions and drips can push the level past the rule that admitted it.

use super::{
    bucket::BucketState,
    config::LeakyBucketConfig,
    error::Result,
    metrics::LimiterMetrics,
    utils::current_time_ms,
    worker,
};
use crate::ring_buffer::RingBuffer;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle state of a [`LeakyBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LimiterState {
    /// The drip thread is active and admissions are decided normally.
    Running = 0,

    /// Stop was signalled; the drip thread may still be finishing a tick.
    Stopping = 1,

    /// The drip thread has exited.
    Stopped = 2,
}

impl LimiterState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// One admission decision, as kept by the request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRecord {
    /// When the decision was made, in milliseconds since the UNIX epoch.
    pub timestamp_ms: u64,

    /// Units requested.
    pub size: u64,

    /// Whether the request was admitted.
    pub admitted: bool,

    /// Bucket level the decision produced or was judged against.
    ///
    /// For an admission, the level right after the units were added. For a
    /// rejection, the level the admission rule saw when it said no; on a
    /// stopped limiter, which decides without consulting the rule, the level
    /// at the time of the call.
    pub level: u64,
}

/// Thread-safe leaky-bucket rate limiter with a background drip thread.
///
/// Admitted work fills the bucket; a dedicated thread drains it at the
/// configured rate. Share it behind an `Arc` to call [`allow`](Self::allow)
/// from many threads.
///
/// ```rust
/// use drip::LeakyBucket;
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let limiter = Arc::new(LeakyBucket::new(5, Duration::from_secs(1))?);
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let limiter = limiter.clone();
///         thread::spawn(move || (0..50).filter(|_| limiter.allow()).count())
///     })
///     .collect();
///
/// let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
/// assert!(admitted <= 100 + 5); // threshold plus whatever dripped meanwhile
///
/// limiter.shutdown();
/// # Ok::<(), drip::Error>(())
/// ```
pub struct LeakyBucket {
    bucket: Arc<BucketState>,
    state: Arc<AtomicU8>,

    /// Taken by the first `stop`.
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,

    /// Taken by the first `shutdown`.
    worker: Mutex<Option<thread::JoinHandle<()>>>,

    config: LeakyBucketConfig,

    admitted: AtomicU64,
    admitted_units: AtomicU64,
    rejected: AtomicU64,
    consecutive_rejections: AtomicU64,

    request_log: Option<Mutex<RingBuffer<AdmissionRecord>>>,
}

impl LeakyBucket {
    /// Creates a limiter draining `rate` units every `per`, with the default
    /// threshold of 100 and the smooth drip policy.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration) when
    /// `rate` or `per` is zero. No thread is started in that case.
    ///
    /// ```rust
    /// use drip::{Error, LeakyBucket};
    /// use std::time::Duration;
    ///
    /// assert!(matches!(
    ///     LeakyBucket::new(0, Duration::from_secs(1)),
    ///     Err(Error::InvalidConfiguration(_))
    /// ));
    /// ```
    pub fn new(rate: u32, per: Duration) -> Result<Self> {
        Self::with_config(LeakyBucketConfig::new(rate, per))
    }

    /// Creates a limiter from a full configuration.
    ///
    /// The configuration is validated before anything is allocated or spawned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration) if
    ///   [`LeakyBucketConfig::validate`] fails
    /// - [`Error::Spawn`](crate::Error::Spawn) if the drip thread cannot be started
    pub fn with_config(config: LeakyBucketConfig) -> Result<Self> {
        config.validate()?;

        let request_log = match config.request_log_capacity {
            0 => None,
            capacity => Some(Mutex::new(RingBuffer::new(capacity)?)),
        };

        let bucket = Arc::new(BucketState::new(&config));
        let state = Arc::new(AtomicU8::new(LimiterState::Running as u8));
        let (handle, stop_tx) = worker::spawn(bucket.clone(), state.clone())?;

        Ok(Self {
            bucket,
            state,
            stop_tx: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(handle)),
            config,
            admitted: AtomicU64::new(0),
            admitted_units: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            consecutive_rejections: AtomicU64::new(0),
            request_log,
        })
    }

    /// Admits one unit if the bucket is below its threshold.
    ///
    /// Never blocks. Always `false` once the limiter has been stopped.
    ///
    /// ```rust
    /// use drip::LeakyBucketConfig;
    /// use drip::LeakyBucket;
    /// use std::time::Duration;
    ///
    /// let config = LeakyBucketConfig::new(1, Duration::from_secs(60)).with_threshold(2);
    /// let limiter = LeakyBucket::with_config(config)?;
    ///
    /// assert!(limiter.allow());
    /// assert!(limiter.allow());
    /// assert!(!limiter.allow());
    /// # Ok::<(), drip::Error>(())
    /// ```
    #[inline]
    pub fn allow(&self) -> bool {
        if !self.is_running() {
            return self.reject_stopped(1);
        }
        let outcome = self.bucket.fill_one();
        self.record(1, outcome)
    }

    /// Admits `size` units if `level + size` stays strictly below the threshold.
    ///
    /// The comparison is strict, so `allow_n(1)` needs one more free slot than
    /// `allow()`; a zero-sized request is admitted whenever the bucket is not
    /// full. Always `false` once the limiter has been stopped.
    ///
    /// ```rust
    /// use drip::{LeakyBucket, LeakyBucketConfig};
    /// use std::time::Duration;
    ///
    /// let config = LeakyBucketConfig::new(1, Duration::from_secs(60)).with_threshold(10);
    /// let limiter = LeakyBucket::with_config(config)?;
    ///
    /// assert!(limiter.allow_n(6));
    /// assert!(!limiter.allow_n(4)); // 6 + 4 is not below 10
    /// assert!(limiter.allow_n(3));
    /// # Ok::<(), drip::Error>(())
    /// ```
    #[inline]
    pub fn allow_n(&self, size: u64) -> bool {
        if !self.is_running() {
            return self.reject_stopped(size);
        }
        let outcome = self.bucket.fill_sized(size);
        self.record(size, outcome)
    }

    /// Signals the drip thread to exit and returns without waiting.
    ///
    /// Idempotent: later calls, and calls racing with this one, do nothing.
    /// Use [`shutdown`](Self::shutdown) to also wait for the thread.
    pub fn stop(&self) {
        if self
            .state
            .compare_exchange(
                LimiterState::Running as u8,
                LimiterState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        if let Some(stop_tx) = lock(&self.stop_tx).take() {
            if stop_tx.send(()).is_err() {
                warn!("Drip thread exited before the stop signal arrived");
            }
        }
    }

    /// Stops the drip thread and waits for it to exit.
    ///
    /// On return the limiter is [`LimiterState::Stopped`]. Idempotent; a
    /// concurrent caller blocks until the first one has joined the thread.
    pub fn shutdown(&self) {
        self.stop();

        let mut worker = lock(&self.worker);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("Drip thread panicked");
            }
        }
        self.state
            .store(LimiterState::Stopped as u8, Ordering::Release);
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> LimiterState {
        LimiterState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` until stop is signalled.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == LimiterState::Running
    }

    /// Current bucket level.
    #[inline]
    pub fn level(&self) -> u64 {
        self.bucket.level()
    }

    /// Room left before the threshold.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.bucket.remaining()
    }

    /// Bucket capacity.
    #[inline]
    pub fn threshold(&self) -> u64 {
        self.bucket.threshold()
    }

    /// Time between drips.
    pub fn drip_interval(&self) -> Duration {
        self.bucket.drip_interval()
    }

    /// Units removed per drip.
    pub fn drip_amount(&self) -> u64 {
        self.bucket.drip_amount()
    }

    /// The configuration this limiter was built from.
    pub fn config(&self) -> &LeakyBucketConfig {
        &self.config
    }

    /// Read-only view of the underlying bucket.
    pub fn bucket(&self) -> &BucketState {
        &self.bucket
    }

    /// Snapshot of admission and drip statistics.
    pub fn metrics(&self) -> LimiterMetrics {
        LimiterMetrics {
            admitted: self.admitted.load(Ordering::Relaxed),
            admitted_units: self.admitted_units.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            consecutive_rejections: self.consecutive_rejections.load(Ordering::Relaxed),
            total_drips: self.bucket.total_drips(),
            total_drained: self.bucket.total_drained(),
            level: self.bucket.level(),
            threshold: self.bucket.threshold(),
        }
    }

    /// Recent admission decisions, oldest first.
    ///
    /// Empty unless the limiter was configured with
    /// [`with_request_log`](LeakyBucketConfig::with_request_log).
    ///
    /// ```rust
    /// use drip::{LeakyBucket, LeakyBucketConfig};
    /// use std::time::Duration;
    ///
    /// let config = LeakyBucketConfig::new(1, Duration::from_secs(60))
    ///     .with_threshold(1)
    ///     .with_request_log(8);
    /// let limiter = LeakyBucket::with_config(config)?;
    /// limiter.allow();
    /// limiter.allow();
    ///
    /// let log = limiter.recent_requests();
    /// assert_eq!(log.len(), 2);
    /// assert!(log[0].admitted);
    /// assert!(!log[1].admitted);
    /// # Ok::<(), drip::Error>(())
    /// ```
    pub fn recent_requests(&self) -> Vec<AdmissionRecord> {
        match &self.request_log {
            Some(log) => lock(log).to_vec(),
            None => Vec::new(),
        }
    }

    /// Updates counters and the request log for a decided admission.
    ///
    /// `outcome` is the bucket's verdict: `Ok` with the new level, or `Err`
    /// with the level the rejection was judged against.
    #[inline]
    fn record(&self, size: u64, outcome: std::result::Result<u64, u64>) -> bool {
        let admitted = outcome.is_ok();
        if admitted {
            self.admitted.fetch_add(1, Ordering::Relaxed);
            self.admitted_units.fetch_add(size, Ordering::Relaxed);
            if self.consecutive_rejections.load(Ordering::Relaxed) > 0 {
                self.consecutive_rejections.store(0, Ordering::Relaxed);
            }
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            self.consecutive_rejections.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(log) = &self.request_log {
            let level = outcome.unwrap_or_else(|judged| judged);
            lock(log).push(AdmissionRecord {
                timestamp_ms: current_time_ms(),
                size,
                admitted,
                level,
            });
        }

        admitted
    }

    #[cold]
    fn reject_stopped(&self, size: u64) -> bool {
        debug!("Rejecting request of {} units: limiter is {:?}", size, self.state());
        self.record(size, Err(self.bucket.level()))
    }
}

impl Drop for LeakyBucket {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LeakyBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeakyBucket")
            .field("state", &self.state())
            .field("level", &self.level())
            .field("threshold", &self.threshold())
            .field("drip_interval", &self.drip_interval())
            .field("drip_amount", &self.drip_amount())
            .finish()
    }
}

/// Locks `mutex`, recovering the guard if a panicking holder poisoned it.
///
/// Every guarded value (the stop sender, the join handle, the request log)
/// stay consistent across a panic, so the poison flag carries no information.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
