//! Basic usage example for the drip crate.
//!
//! Run with: `RUST_LOG=drip=debug cargo run --example basic`

use drip::{DripPolicy, LeakyBucket, LeakyBucketBuilder, LeakyBucketConfig, RingBuffer};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> drip::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drip=info")),
        )
        .init();

    println!("=== Basic Leaky Bucket Example ===\n");

    simple_example()?;
    println!("\n{}\n", "=".repeat(50));

    batch_example()?;
    println!("\n{}\n", "=".repeat(50));

    sized_example()?;
    println!("\n{}\n", "=".repeat(50));

    request_log_example()?;
    println!("\n{}\n", "=".repeat(50));

    ring_buffer_example()
}

fn simple_example() -> drip::Result<()> {
    println!("1. Smooth drip:");

    // 5 units per second, one unit every 200ms
    let config = LeakyBucketConfig::per_second(5).with_threshold(10);
    let limiter = LeakyBucket::with_config(config)?;
    println!(
        "   threshold={}, drip {} every {:?}",
        limiter.threshold(),
        limiter.drip_amount(),
        limiter.drip_interval()
    );

    let (mut admitted, mut rejected) = (0, 0);
    for i in 1..=15 {
        if limiter.allow() {
            admitted += 1;
            println!("   Request {} - allowed", i);
        } else {
            rejected += 1;
            println!("   Request {} - rejected", i);
        }
    }
    println!("   Results: {} allowed, {} rejected", admitted, rejected);

    thread::sleep(Duration::from_millis(450));
    println!("   After 450ms the level is {}", limiter.level());

    limiter.shutdown();
    Ok(())
}

fn batch_example() -> drip::Result<()> {
    println!("2. Batch drip:");

    let limiter = LeakyBucketBuilder::new()
        .rate(5)
        .per(Duration::from_millis(500))
        .threshold(10)
        .policy(DripPolicy::Batch)
        .build()?;

    while limiter.allow() {}
    println!("   Filled to {}", limiter.level());

    thread::sleep(Duration::from_millis(600));
    println!(
        "   After one {:?} tick the level is {}",
        limiter.drip_interval(),
        limiter.level()
    );

    limiter.shutdown();
    Ok(())
}

fn sized_example() -> drip::Result<()> {
    println!("3. Sized requests:");

    let config = LeakyBucketConfig::per_second(10).with_threshold(20);
    let limiter = LeakyBucket::with_config(config)?;

    for size in [5, 8, 6, 1] {
        let outcome = if limiter.allow_n(size) {
            "allowed"
        } else {
            "rejected"
        };
        println!(
            "   allow_n({}) - {} (level {}/{})",
            size,
            outcome,
            limiter.level(),
            limiter.threshold()
        );
    }

    let metrics = limiter.metrics();
    println!("   {}", metrics.summary());
    println!("   Health: {}", metrics.health_status());

    limiter.shutdown();
    Ok(())
}

fn request_log_example() -> drip::Result<()> {
    println!("4. Request log:");

    let config = LeakyBucketConfig::per_second(2)
        .with_threshold(3)
        .with_request_log(4);
    let limiter = LeakyBucket::with_config(config)?;

    for _ in 0..6 {
        limiter.allow();
    }

    for record in limiter.recent_requests() {
        println!(
            "   t={}ms size={} admitted={} level={}",
            record.timestamp_ms, record.size, record.admitted, record.level
        );
    }

    limiter.shutdown();
    Ok(())
}

fn ring_buffer_example() -> drip::Result<()> {
    println!("5. Ring buffer:");

    let mut ring = RingBuffer::new(5)?;
    for value in [3, 1, 234, 44, 9] {
        ring.push(value);
    }
    println!("   Full: {:?}", ring.to_vec());

    if let Some(evicted) = ring.push(7) {
        println!("   Pushing 7 evicted {}", evicted);
    }

    while let Ok(value) = ring.pop() {
        println!("   pop -> {}", value);
    }

    match ring.pop() {
        Err(err) => println!("   pop on empty -> {}", err),
        Ok(value) => println!("   unexpected value {}", value),
    }

    Ok(())
}
