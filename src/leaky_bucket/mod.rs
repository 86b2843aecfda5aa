//! # Leaky Bucket Module
//!
//! ```text
//!     leaky_bucket/
//!     ├── mod.rs          (module organization)
//!     ├── config.rs       (parameters, drip policies, validation)
//!     ├── bucket.rs       (atomic level and drip arithmetic)
//!     ├── core.rs         (LeakyBucket controller and lifecycle)
//!     ├── worker.rs       (background drip thread)
//!     ├── metrics.rs      (snapshots and health)
//!     ├── error.rs        (error type)
//!     └── utils.rs        (backoff, cache alignment, clock)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     allow() / allow_n()           drip thread
//!            │                           │
//!            ▼                           ▼
//!     ┌─────────────┐  Arc<BucketState> ┌────────┐
//!     │ LeakyBucket │ ◄───────────────► │ worker │
//!     └──────┬──────┘                   └────────┘
//!            │ CAS on level
//!            ▼
//!     ┌─────────────┐
//!     │ BucketState │
//!     └─────────────┘
//! ```

mod bucket;
mod config;
mod core;
mod error;
mod metrics;
mod utils;
mod worker;

/// Bucket counter and drip parameters
pub use bucket::BucketState;

/// Configuration types
pub use config::{DripPolicy, LeakyBucketConfig, MemoryOrdering, DEFAULT_THRESHOLD};

/// Rate limiter controller
pub use self::core::{AdmissionRecord, LeakyBucket, LimiterState};

/// Error handling
pub use error::{Error, Result};

/// Observability
pub use metrics::{HealthStatus, LimiterMetrics};

/// Time and spin helpers
pub use utils::{cpu_relax, current_time_ms};
