/*!
 * Condition Variable Integration Tests
 *
 * Ownership checks, FIFO signalling and re-acquisition after waits
 */

use pretty_assertions::assert_eq;
use queued_sync::{CancelToken, ExclusiveLock, SyncConfig, SyncError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < Duration::from_secs(10));
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_operations_require_lock_owner() {
    let lock = ExclusiveLock::new();
    let cond = lock.new_condition();

    assert!(matches!(cond.wait(None), Err(SyncError::IllegalState(_))));
    assert!(matches!(cond.signal(), Err(SyncError::IllegalState(_))));
    assert!(matches!(cond.signal_all(), Err(SyncError::IllegalState(_))));

    lock.lock();
    cond.signal().unwrap();
    cond.signal_all().unwrap();
    lock.unlock().unwrap();
}

#[test]
fn test_signal_wakes_waiters_in_order() {
    const WAITERS: usize = 8;
    let lock = ExclusiveLock::with_config(SyncConfig::no_spin());
    let cond = Arc::new(lock.new_condition());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut handles = Vec::with_capacity(WAITERS);
    for index in 0..WAITERS {
        let lock = lock.clone();
        let cond_clone = cond.clone();
        let order = order.clone();
        handles.push(thread::spawn(move || {
            lock.lock();
            cond_clone.wait(None).unwrap();
            assert!(lock.is_held_by_current_thread());
            order.lock().push(index);
            lock.unlock().unwrap();
        }));
        wait_until(|| cond.waiter_count() == index + 1);
    }

    for _ in 0..WAITERS {
        lock.lock();
        cond.signal().unwrap();
        lock.unlock().unwrap();
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<usize> = (0..WAITERS).collect();
    assert_eq!(*order.lock(), expected);
    assert!(!cond.has_waiters());
}

#[test]
fn test_signal_all_transfers_everyone() {
    const WAITERS: usize = 16;
    let lock = ExclusiveLock::new();
    let cond = Arc::new(lock.new_condition());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut handles = Vec::with_capacity(WAITERS);
    for index in 0..WAITERS {
        let lock = lock.clone();
        let cond_clone = cond.clone();
        let order = order.clone();
        handles.push(thread::spawn(move || {
            lock.lock();
            cond_clone.wait(None).unwrap();
            order.lock().push(index);
            lock.unlock().unwrap();
        }));
        wait_until(|| cond.waiter_count() == index + 1);
    }

    lock.lock();
    cond.signal_all().unwrap();
    assert_eq!(cond.waiter_count(), 0);
    assert_eq!(lock.queue_len(), WAITERS);
    lock.unlock().unwrap();

    for handle in handles {
        handle.join().unwrap();
    }
    let expected: Vec<usize> = (0..WAITERS).collect();
    assert_eq!(*order.lock(), expected);
}

#[test]
fn test_cancelled_wait_reacquires_before_returning() {
    let lock = ExclusiveLock::new();
    let cond = Arc::new(lock.new_condition());
    let cancel = CancelToken::new();

    let handle = {
        let lock = lock.clone();
        let cond = cond.clone();
        let cancel = cancel.clone();
        thread::spawn(move || {
            lock.lock();
            let result = cond.wait(Some(&cancel));
            let held = lock.is_held_by_current_thread();
            lock.unlock().unwrap();
            (result, held)
        })
    };
    wait_until(|| cond.waiter_count() == 1);

    // Hold the lock while cancelling so the waiter has to queue for it
    lock.lock();
    cancel.cancel();
    wait_until(|| lock.queue_len() == 1);
    lock.unlock().unwrap();

    let (result, held) = handle.join().unwrap();
    assert_eq!(result, Err(SyncError::Interrupted));
    assert!(held);
    assert!(!cond.has_waiters());
}

#[test]
fn test_wait_timeout_returns_false_with_lock_held() {
    let lock = ExclusiveLock::new();
    let cond = lock.new_condition();
    lock.lock();

    let start = Instant::now();
    let signalled = cond.wait_timeout(Duration::from_millis(50), None).unwrap();
    assert!(!signalled);
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(lock.is_held_by_current_thread());
    lock.unlock().unwrap();
}

#[test]
fn test_uninterruptible_wait_ignores_nothing_but_signal() {
    let lock = ExclusiveLock::new();
    let cond = Arc::new(lock.new_condition());
    let woken = Arc::new(AtomicBool::new(false));

    let handle = {
        let lock = lock.clone();
        let cond = cond.clone();
        let woken = woken.clone();
        thread::spawn(move || {
            lock.lock();
            cond.wait_uninterruptibly().unwrap();
            woken.store(true, Ordering::SeqCst);
            lock.unlock().unwrap();
        })
    };
    wait_until(|| cond.waiter_count() == 1);
    thread::sleep(Duration::from_millis(20));
    assert!(!woken.load(Ordering::SeqCst));

    lock.lock();
    cond.signal().unwrap();
    lock.unlock().unwrap();
    handle.join().unwrap();
    assert!(woken.load(Ordering::SeqCst));
}
