//! # Errors
//!
//! Construction is the only fallible part of a limiter. Once a [`LeakyBucket`]
//! is running, admission never fails: it returns `true` or `false`.
//!
//! [`LeakyBucket`]: crate::LeakyBucket

/// Errors returned by this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A construction parameter was rejected during validation.
    ///
    /// No drip thread is started when this is returned.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// `pop` was called on an empty [`RingBuffer`](crate::RingBuffer).
    #[error("ring buffer is empty")]
    EmptyBuffer,

    /// The operating system refused to start the drip thread.
    #[error("failed to spawn drip thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
