use drip::{DripPolicy, Error, LeakyBucket, LeakyBucketConfig, LimiterState, RingBuffer};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Fires `callers` simultaneous `allow()` calls and counts the admissions.
fn burst(limiter: &Arc<LeakyBucket>, callers: usize) -> usize {
    let barrier = Arc::new(Barrier::new(callers));
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let limiter = limiter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                limiter.allow()
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&admitted| admitted)
        .count()
}

#[test]
fn test_burst_then_one_smooth_tick() {
    let limiter = Arc::new(LeakyBucket::new(5, Duration::from_secs(1)).unwrap());
    assert_eq!(limiter.drip_interval(), Duration::from_millis(200));

    assert_eq!(burst(&limiter, 100), 100);
    assert_eq!(limiter.level(), 100);
    assert!(!limiter.allow());
    assert!(!limiter.allow());

    // One smooth drip frees exactly one slot
    thread::sleep(Duration::from_millis(300));
    assert!(limiter.allow());

    limiter.shutdown();
}

#[test]
fn test_burst_then_one_batch_tick() {
    let config = LeakyBucketConfig::new(5, Duration::from_secs(1)).with_policy(DripPolicy::Batch);
    let limiter = Arc::new(LeakyBucket::with_config(config).unwrap());

    assert_eq!(burst(&limiter, 100), 100);
    assert!(!limiter.allow());

    thread::sleep(Duration::from_millis(1300));

    // A batch drip frees `rate` slots at once
    let admitted = (0..10).filter(|_| limiter.allow()).count();
    assert!(admitted >= 5, "expected at least 5 admissions, got {}", admitted);

    limiter.shutdown();
}

#[test]
fn test_capacity_bound_under_contention() {
    let config = LeakyBucketConfig::new(1, Duration::from_secs(3600)).with_threshold(250);
    let limiter = Arc::new(LeakyBucket::with_config(config).unwrap());
    let barrier = Arc::new(Barrier::new(20));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let limiter = limiter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut admitted = 0u64;
                for i in 0..100u64 {
                    let ok = if i % 3 == 0 {
                        limiter.allow_n(2)
                    } else {
                        limiter.allow()
                    };
                    if ok {
                        admitted += if i % 3 == 0 { 2 } else { 1 };
                    }
                    assert!(limiter.level() <= 250);
                }
                admitted
            })
        })
        .collect();

    let admitted_units: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted_units, limiter.level());
    assert!(limiter.level() <= 250);
    assert_eq!(limiter.metrics().admitted_units, admitted_units);
}

#[test]
fn test_drains_to_zero_while_idle() {
    let config = LeakyBucketConfig::new(20, Duration::from_millis(200)).with_threshold(20);
    let limiter = LeakyBucket::with_config(config).unwrap();
    assert_eq!(limiter.drip_interval(), Duration::from_millis(10));

    while limiter.allow() {}
    assert_eq!(limiter.level(), 20);

    // 20 ticks of 10ms, with plenty of margin
    let deadline = Instant::now() + Duration::from_secs(3);
    while limiter.level() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(limiter.level(), 0);
    assert!(limiter.metrics().total_drained >= 20);
}

#[test]
fn test_invalid_configuration_starts_nothing() {
    for (rate, per) in [(0, Duration::from_secs(1)), (5, Duration::ZERO), (0, Duration::ZERO)] {
        match LeakyBucket::new(rate, per) {
            Err(Error::InvalidConfiguration(reason)) => assert!(!reason.is_empty()),
            other => panic!("rate={} per={:?}: expected error, got {:?}", rate, per, other),
        }
    }
}

#[test]
fn test_repeated_start_stop_cycles() {
    for cycle in 0..50 {
        let config = LeakyBucketConfig::new(1000, Duration::from_millis(100)).with_threshold(10);
        let limiter = LeakyBucket::with_config(config).unwrap();
        assert!(limiter.allow());

        if cycle % 2 == 0 {
            limiter.shutdown();
            assert_eq!(limiter.state(), LimiterState::Stopped);
        }
        // Odd cycles rely on Drop to stop and join the drip thread
    }
}

#[test]
fn test_stop_then_shutdown() {
    let limiter = LeakyBucket::new(1, Duration::from_secs(3600)).unwrap();
    assert!(limiter.allow());

    limiter.stop();
    limiter.stop();
    assert!(!limiter.allow());

    let started = Instant::now();
    limiter.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(limiter.state(), LimiterState::Stopped);
    assert!(!limiter.allow());

    let metrics = limiter.metrics();
    assert_eq!(metrics.admitted, 1);
    assert_eq!(metrics.rejected, 2);
}

#[test]
fn test_stopped_bucket_stops_draining() {
    let config = LeakyBucketConfig::new(10, Duration::from_millis(100)).with_threshold(5);
    let limiter = LeakyBucket::with_config(config).unwrap();
    while limiter.allow() {}
    limiter.shutdown();

    let level = limiter.level();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(limiter.level(), level);
}

#[test]
fn test_request_log_with_concurrent_callers() {
    let config = LeakyBucketConfig::new(1, Duration::from_secs(3600))
        .with_threshold(10)
        .with_request_log(32);
    let limiter = Arc::new(LeakyBucket::with_config(config).unwrap());

    assert_eq!(burst(&limiter, 16), 10);

    let log = limiter.recent_requests();
    assert_eq!(log.len(), 16);
    assert_eq!(log.iter().filter(|r| r.admitted).count(), 10);
    assert!(log.iter().all(|r| r.size == 1 && r.level <= 10));
}

#[test]
fn test_ring_buffer_scenario() {
    let mut ring = RingBuffer::new(5).unwrap();
    for value in [3, 1, 234, 44, 9] {
        ring.push(value);
    }
    assert_eq!(ring.peek(), Some(&3));

    assert_eq!(ring.push(7), Some(3));
    let drained: Vec<i32> = std::iter::from_fn(|| ring.pop().ok()).collect();
    assert_eq!(drained, vec![1, 234, 44, 9, 7]);
    assert!(matches!(ring.pop(), Err(Error::EmptyBuffer)));
}
