//! Drives a limiter from several threads and reports how it held up.
//!
//! Run with: `RUST_LOG=drip=debug cargo run --example load`

use drip::{LeakyBucket, LeakyBucketConfig, SharedLeakyBucket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const WORKERS: usize = 8;
const RUN_FOR: Duration = Duration::from_secs(3);

fn main() -> drip::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drip=info")),
        )
        .init();

    let config = LeakyBucketConfig::per_second(200).with_threshold(50);
    let limiter: SharedLeakyBucket = Arc::new(LeakyBucket::with_config(config)?);
    let done = Arc::new(AtomicBool::new(false));

    println!(
        "Running {} workers for {:?} against {:.0} units/s, threshold {}",
        WORKERS,
        RUN_FOR,
        limiter.config().effective_rate_per_second(),
        limiter.threshold()
    );

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let limiter = limiter.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut admitted = 0u64;
                while !done.load(Ordering::Relaxed) {
                    if limiter.allow() {
                        admitted += 1;
                    } else {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                admitted
            })
        })
        .collect();

    let started = Instant::now();
    while started.elapsed() < RUN_FOR {
        thread::sleep(Duration::from_millis(500));
        let metrics = limiter.metrics();
        println!(
            "[{:>5}ms] level {:>3}/{} | {}",
            started.elapsed().as_millis(),
            metrics.level,
            metrics.threshold,
            metrics.health_status()
        );
    }

    done.store(true, Ordering::Relaxed);
    let admitted: u64 = handles.into_iter().filter_map(|h| h.join().ok()).sum();

    limiter.stop();
    limiter.shutdown();

    let metrics = limiter.metrics();
    let elapsed = started.elapsed().as_secs_f64();
    println!("\n{}", metrics.summary());
    println!(
        "Admitted {} in {:.2}s ({:.1}/s), state {:?}",
        admitted,
        elapsed,
        admitted as f64 / elapsed,
        limiter.state()
    );
    if metrics.health_status().is_unhealthy() {
        println!("Suggested: {}", metrics.health_status().suggested_action());
    }

    Ok(())
}
