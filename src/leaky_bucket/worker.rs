//! # Drip Worker
//!
//! The background thread that drains a bucket. It sleeps on the stop channel
//! with a deadline, so a stop request wakes it immediately instead of waiting
//! out the rest of the interval:
//!
//! ```text
//!     ──┬────────┬────────┬──────X
//!       drip     drip     drip   stop received mid-wait → exit
//! ```
//!
//! Ticks are scheduled against fixed deadlines. If the thread falls behind
//! (suspended process, overloaded host) the missed ticks are dropped rather
//! than replayed in a burst.

use super::{bucket::BucketState, core::LimiterState};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name given to every drip thread.
pub(crate) const DRIP_THREAD_NAME: &str = "drip-worker";

/// Spawns the drip thread for `bucket`.
///
/// The thread exits when `()` arrives on the returned sender or when the
/// sender is dropped, then marks `state` as stopped.
pub(crate) fn spawn(
    bucket: Arc<BucketState>,
    state: Arc<AtomicU8>,
) -> std::io::Result<(thread::JoinHandle<()>, mpsc::Sender<()>)> {
    let (stop_tx, stop_rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name(DRIP_THREAD_NAME.to_string())
        .spawn(move || {
            let interval = bucket.drip_interval();
            info!(
                "Started drip thread (interval: {:?}, amount: {})",
                interval,
                bucket.drip_amount()
            );

            // `None` once the next deadline lies beyond what `Instant` can
            // represent: no tick will ever fire, so only a stop can wake us.
            let mut next_tick = Instant::now().checked_add(interval);
            if next_tick.is_none() {
                warn!(
                    "Drip interval {:?} is beyond the clock range; the bucket will not drain",
                    interval
                );
            }

            loop {
                let signal = match next_tick {
                    Some(deadline) => {
                        stop_rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    }
                    None => stop_rx
                        .recv()
                        .map_err(|_| mpsc::RecvTimeoutError::Disconnected),
                };

                match signal {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                        info!("Drip thread stopping");
                        break;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        let drained = bucket.drip();
                        if drained > 0 {
                            debug!("Drained {} units (level: {})", drained, bucket.level());
                        }

                        // Missed ticks are dropped: resync from now when behind
                        let now = Instant::now();
                        next_tick = next_tick
                            .and_then(|deadline| deadline.checked_add(interval))
                            .filter(|deadline| *deadline > now)
                            .or_else(|| now.checked_add(interval));
                    }
                }
            }

            state.store(LimiterState::Stopped as u8, Ordering::Release);
        })?;

    Ok((handle, stop_tx))
}
