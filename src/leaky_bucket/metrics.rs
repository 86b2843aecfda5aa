//! # Metrics
//!
//! Point-in-time snapshots of a limiter for logging and health checks.
//!
//! ```text
//!     LeakyBucket Metrics:
//!     ├─ Admission:  success 92%, 3 consecutive rejections
//!     ├─ Bucket:     level 64/100 (64% full)
//!     ├─ Drips:      240 ticks, 236 units drained
//!     └─ Health:     Healthy
//! ```

use std::fmt;

/// Consecutive rejections above which a limiter counts as under sustained pressure.
const SUSTAINED_REJECTION_STREAK: u64 = 10;

/// Rejection ratio above which a limiter counts as under sustained pressure.
const SUSTAINED_REJECTION_RATIO: f64 = 0.3;

/// Snapshot of a [`LeakyBucket`](crate::LeakyBucket).
///
/// The fields are read one by one while the limiter keeps running, so they
/// are individually accurate but not a single atomic cut.
///
/// ```rust
/// use drip::LeakyBucket;
/// use std::time::Duration;
///
/// let limiter = LeakyBucket::new(5, Duration::from_secs(1))?;
/// limiter.allow();
///
/// let metrics = limiter.metrics();
/// assert_eq!(metrics.admitted, 1);
/// assert_eq!(metrics.level, 1);
/// println!("{}", metrics);
/// # Ok::<(), drip::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterMetrics {
    /// Requests admitted.
    pub admitted: u64,

    /// Units admitted (equal to `admitted` unless `allow_n` was used).
    pub admitted_units: u64,

    /// Requests rejected, including those made after stop.
    pub rejected: u64,

    /// Rejections since the last admission.
    pub consecutive_rejections: u64,

    /// Drip ticks processed.
    pub total_drips: u64,

    /// Units removed by drips.
    pub total_drained: u64,

    /// Bucket level at snapshot time.
    pub level: u64,

    /// Bucket capacity.
    pub threshold: u64,
}

impl LimiterMetrics {
    /// Admitted requests over all requests, `1.0` before the first request.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            1.0
        } else {
            self.admitted as f64 / total as f64
        }
    }

    /// Rejected requests over all requests.
    #[inline]
    pub fn rejection_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }

    /// Admitted plus rejected.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.admitted + self.rejected
    }

    /// How full the bucket is, from `0.0` (empty) to `1.0` (at threshold).
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.threshold == 0 {
            0.0
        } else {
            self.level as f64 / self.threshold as f64
        }
    }

    /// Free capacity as a percentage of the threshold.
    #[inline]
    pub fn available_percentage(&self) -> f64 {
        (1.0 - self.utilization()) * 100.0
    }

    /// Fewer than half of the requests got through, or the bucket is full.
    pub fn is_under_pressure(&self) -> bool {
        self.success_rate() < 0.5 || self.level >= self.threshold
    }

    /// A long rejection streak, or a high rejection ratio overall.
    pub fn is_under_sustained_pressure(&self) -> bool {
        self.consecutive_rejections > SUSTAINED_REJECTION_STREAK
            || self.rejection_rate() > SUSTAINED_REJECTION_RATIO
    }

    /// Three-level health summary.
    ///
    /// ```rust
    /// use drip::{HealthStatus, LeakyBucket};
    /// use std::time::Duration;
    ///
    /// let limiter = LeakyBucket::new(5, Duration::from_secs(1))?;
    /// assert_eq!(limiter.metrics().health_status(), HealthStatus::Healthy);
    /// # Ok::<(), drip::Error>(())
    /// ```
    pub fn health_status(&self) -> HealthStatus {
        if self.is_under_sustained_pressure() {
            HealthStatus::Critical
        } else if self.is_under_pressure() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Multi-line report suitable for logs.
    pub fn summary(&self) -> String {
        format!(
            "LeakyBucket Metrics:\n\
             ├─ Admission:\n\
             │  ├─ Admitted: {} ({} units)\n\
             │  ├─ Rejected: {}\n\
             │  ├─ Success Rate: {:.2}%\n\
             │  └─ Consecutive Rejections: {}\n\
             ├─ Bucket:\n\
             │  ├─ Level: {}/{}\n\
             │  ├─ Utilization: {:.2}%\n\
             │  └─ Available: {:.2}%\n\
             ├─ Drips:\n\
             │  ├─ Ticks: {}\n\
             │  └─ Drained: {}\n\
             └─ Health: {:?}",
            self.admitted,
            self.admitted_units,
            self.rejected,
            self.success_rate() * 100.0,
            self.consecutive_rejections,
            self.level,
            self.threshold,
            self.utilization() * 100.0,
            self.available_percentage(),
            self.total_drips,
            self.total_drained,
            self.health_status(),
        )
    }
}

impl fmt::Display for LimiterMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Health of a limiter as seen from its metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Requests mostly get through and the bucket has room.
    Healthy,

    /// The bucket is full or most requests are being rejected.
    Degraded,

    /// Rejections are persistent: demand consistently exceeds the drip rate.
    Critical,
}

impl HealthStatus {
    /// Anything but `Healthy`.
    pub fn is_unhealthy(&self) -> bool {
        !matches!(self, Self::Healthy)
    }

    /// Operator hint for the status.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::Healthy => "No action needed",
            Self::Degraded => "Monitor closely; the bucket is at or near its threshold",
            Self::Critical => "Raise the rate or threshold, or shed load upstream",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("Healthy"),
            Self::Degraded => f.write_str("Degraded"),
            Self::Critical => f.write_str("Critical"),
        }
    }
}
