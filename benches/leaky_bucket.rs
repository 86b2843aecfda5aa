//! # Leaky Bucket Benchmarks
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use drip::{LeakyBucket, LeakyBucketConfig, MemoryOrdering, RingBuffer};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// A limiter that effectively never drips and never fills during a bench run.
fn roomy_limiter(ordering: MemoryOrdering) -> LeakyBucket {
    let config = LeakyBucketConfig::new(1, Duration::from_secs(3600))
        .with_threshold(u64::MAX)
        .with_ordering(ordering);
    LeakyBucket::with_config(config).expect("valid bench configuration")
}

/// Single-threaded admissions that always succeed
fn bench_allow(c: &mut Criterion) {
    let mut group = c.benchmark_group("allow");
    group.throughput(Throughput::Elements(1));

    let limiter = roomy_limiter(MemoryOrdering::AcquireRelease);
    group.bench_function("admitted", |b| {
        b.iter(|| std::hint::black_box(limiter.allow()))
    });

    let config = LeakyBucketConfig::new(1, Duration::from_secs(3600)).with_threshold(1);
    let full = LeakyBucket::with_config(config).expect("valid bench configuration");
    full.allow();
    group.bench_function("rejected", |b| b.iter(|| std::hint::black_box(full.allow())));

    group.finish();
}

/// Sized admissions
fn bench_allow_n(c: &mut Criterion) {
    let mut group = c.benchmark_group("allow_n");
    let limiter = roomy_limiter(MemoryOrdering::AcquireRelease);

    for size in [1u64, 8, 64] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| std::hint::black_box(limiter.allow_n(size)))
        });
    }

    group.finish();
}

/// Cost of each memory ordering on the admission path
fn bench_memory_orderings(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_orderings");

    let orderings = [
        ("Relaxed", MemoryOrdering::Relaxed),
        ("AcquireRelease", MemoryOrdering::AcquireRelease),
        ("Sequential", MemoryOrdering::Sequential),
    ];

    for (name, ordering) in orderings {
        let limiter = roomy_limiter(ordering);
        group.bench_function(name, |b| b.iter(|| std::hint::black_box(limiter.allow())));
    }

    group.finish();
}

/// Contended admissions from several threads released together
fn bench_concurrent_allow(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_allow");

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", threads)),
            &threads,
            |b, &threads| {
                let limiter = Arc::new(roomy_limiter(MemoryOrdering::AcquireRelease));

                b.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let barrier = Arc::new(Barrier::new(threads + 1));
                        let handles: Vec<_> = (0..threads)
                            .map(|_| {
                                let limiter = limiter.clone();
                                let barrier = barrier.clone();
                                thread::spawn(move || {
                                    barrier.wait();
                                    for _ in 0..1000 {
                                        std::hint::black_box(limiter.allow());
                                    }
                                })
                            })
                            .collect();

                        barrier.wait();
                        let start = Instant::now();
                        for handle in handles {
                            handle.join().expect("bench thread panicked");
                        }
                        total += start.elapsed();
                    }
                    total
                });
            },
        );
    }

    group.finish();
}

/// Request log overhead on the admission path
fn bench_request_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_log");

    let config = LeakyBucketConfig::new(1, Duration::from_secs(3600))
        .with_threshold(u64::MAX)
        .with_request_log(1024);
    let limiter = LeakyBucket::with_config(config).expect("valid bench configuration");
    group.bench_function("allow_logged", |b| {
        b.iter(|| std::hint::black_box(limiter.allow()))
    });

    let mut ring = RingBuffer::new(1024).expect("non-zero capacity");
    group.bench_function("ring_push_overwrite", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            std::hint::black_box(ring.push(i))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_allow,
    bench_allow_n,
    bench_memory_orderings,
    bench_concurrent_allow,
    bench_request_log
);
criterion_main!(benches);
