/*!
 * Time-Share Tests
 * Activation exclusion and blocking await across threads
 */

use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest, ResourceFlags};
use interval_arbiter::{ArbiterConfig, ArbiterError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn timeshare_pair(
    config: ArbiterConfig,
) -> (Arc<interval_arbiter::Arbiter>, interval_arbiter::Resource, interval_arbiter::Resource) {
    let registry = Registry::new();
    let arbiter = registry
        .init_with_config("irq", DomainKind::Interval, 0, 15, config)
        .unwrap();
    arbiter.seed(0, 15).unwrap();
    let req = ReserveRequest::at(9, 1).timeshare();
    let a = arbiter.reserve(req.clone()).unwrap();
    let b = arbiter.reserve(req).unwrap();
    (arbiter, a, b)
}

#[test]
fn test_timeshare_exclusion() {
    let (_arbiter, a, b) = timeshare_pair(ArbiterConfig::checked());

    a.activate().unwrap();
    assert!(matches!(b.activate(), Err(ArbiterError::Busy(_))));
    assert!(!b.flags().unwrap().contains(ResourceFlags::ACTIVE));

    a.deactivate().unwrap();
    b.activate().unwrap();
    assert!(matches!(a.activate(), Err(ArbiterError::Busy(_))));
}

#[test]
fn test_release_of_holder_unblocks_waiter() {
    let (arbiter, a, b) = timeshare_pair(ArbiterConfig::checked());
    a.activate().unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let waiter = {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let result = b.await_activation(0, Some(Duration::from_secs(10)));
            (result, b)
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    a.release().unwrap();

    let (result, b) = waiter.join().unwrap();
    result.unwrap();
    assert!(b.is_active().unwrap());
    // Group dissolved when the holder left
    assert_eq!(arbiter.stats().share_groups, 0);
    b.release().unwrap();
}

#[test]
fn test_await_default_uses_configured_timeout() {
    let config = ArbiterConfig::default().with_await_timeout(Some(Duration::from_millis(30)));
    let (_arbiter, a, b) = timeshare_pair(config);
    a.activate().unwrap();

    let started = std::time::Instant::now();
    assert_eq!(b.await_default(0).unwrap_err(), ArbiterError::Timeout);
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert!(!b.is_active().unwrap());
}

#[test]
fn test_waiters_take_turns() {
    let registry = Registry::new();
    let arbiter = registry
        .init_with_config("turns", DomainKind::Interval, 0, 0, ArbiterConfig::checked())
        .unwrap();
    arbiter.seed(0, 0).unwrap();

    const THREADS: usize = 4;
    const ROUNDS: usize = 25;
    let inside = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let res = arbiter.reserve(ReserveRequest::at(0, 1).timeshare()).unwrap();
            let inside = Arc::clone(&inside);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    res.await_activation(1, Some(Duration::from_secs(30))).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                    res.deactivate().unwrap();
                }
                res.release().unwrap();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert!(!arbiter.has_allocations());
}
