//! # Utilities
//!
//! Small helpers shared by the bucket and the drip thread: spin-loop hints, a
//! contention backoff, a cache-line wrapper for the hot counter, and a
//! millisecond clock for request log timestamps.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// Wall-clock epoch captured once, advanced with a monotonic Instant so
// timestamps never run backwards when the system clock is adjusted.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

/// Tells the CPU we are spinning on a contended value.
///
/// Emits PAUSE on x86_64 and YIELD on aarch64 via [`std::hint::spin_loop`].
#[inline(always)]
pub fn cpu_relax() {
    std::hint::spin_loop();
}

/// Milliseconds since the UNIX epoch, monotonic for the life of the process.
///
/// ```rust
/// use drip::current_time_ms;
///
/// let a = current_time_ms();
/// let b = current_time_ms();
/// assert!(b >= a);
/// ```
#[inline]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    });
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

/// Pads a value to its own cache line so admissions hammering the bucket
/// level do not false-share with the read-mostly configuration next to it.
#[cfg_attr(target_arch = "aarch64", repr(C, align(128)))]
#[cfg_attr(not(target_arch = "aarch64"), repr(C, align(64)))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

impl<T> CacheAligned<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheAligned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Exponential backoff for CAS retry loops.
///
/// Spins 1, 2, 4, 8 times on the first retries, then yields to the scheduler.
/// It never gives up: callers retry until their CAS lands or their predicate
/// fails, so contention alone never turns into a rejection.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    step: u32,
}

/// Spin rounds before [`Backoff`] starts yielding.
const SPIN_LIMIT: u32 = 4;

impl Backoff {
    pub(crate) fn new() -> Self {
        Self { step: 0 }
    }

    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step < SPIN_LIMIT {
            for _ in 0..(1 << self.step) {
                cpu_relax();
            }
            self.step += 1;
        } else {
            std::thread::yield_now();
        }
    }
}
