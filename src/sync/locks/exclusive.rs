/*!
 * Exclusive Lock
 *
 * Non-reentrant lock over the queued synchronizer. State 0 is free and 1 is
 * held; the owner is recorded by the thread that wins the 0 -> 1 transition.
 */

use crate::errors::SyncResult;
use crate::sync::cancel::CancelToken;
use crate::sync::condition::Condition;
use crate::sync::config::SyncConfig;
use crate::sync::synchronizer::QueuedSynchronizer;
use crate::sync::traits::AcquireStrategy;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const FREE: usize = 0;
const HELD: usize = 1;

/// 0/1 acquire decision
#[derive(Debug, Default, Clone, Copy)]
pub struct ExclusiveStrategy;

impl AcquireStrategy for ExclusiveStrategy {
    #[inline]
    fn try_acquire(&self, current: usize, _arg: usize, _held_by_caller: bool) -> Option<usize> {
        (current == FREE).then_some(HELD)
    }

    /// Any release of a held lock is accepted; only a free lock is illegal
    #[inline]
    fn try_release(&self, current: usize, _arg: usize, _held_by_caller: bool) -> Option<usize> {
        (current != FREE).then_some(FREE)
    }

    fn name(&self) -> &'static str {
        "exclusive"
    }
}

/// Non-reentrant mutual exclusion lock
///
/// # Caller Contract
///
/// The lock is **not reentrant**: a thread that holds it and calls `lock()`
/// again blocks forever. Conditions created by `new_condition` require the
/// calling thread to hold the lock.
///
/// # Examples
///
/// ```
/// use queued_sync::sync::ExclusiveLock;
///
/// let lock = ExclusiveLock::new();
/// lock.lock();
/// assert!(lock.is_locked());
/// lock.unlock().unwrap();
/// assert!(!lock.is_locked());
/// ```
#[derive(Debug, Clone)]
pub struct ExclusiveLock {
    sync: Arc<QueuedSynchronizer<ExclusiveStrategy>>,
}

impl ExclusiveLock {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            sync: Arc::new(QueuedSynchronizer::with_config(ExclusiveStrategy, config)),
        }
    }

    /// Block until the lock is acquired
    #[inline]
    pub fn lock(&self) {
        self.sync.acquire(HELD);
    }

    /// Block until acquired or `cancel` fires
    #[inline]
    pub fn lock_interruptibly(&self, cancel: &CancelToken) -> SyncResult<()> {
        self.sync.acquire_interruptibly(HELD, cancel)
    }

    /// Acquire only if free and nobody is queued
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.sync.try_acquire(HELD)
    }

    /// Acquire within `timeout`; `Ok(false)` when it elapses
    #[inline]
    pub fn try_lock_for(&self, timeout: Duration, cancel: Option<&CancelToken>) -> SyncResult<bool> {
        self.sync.try_acquire_for(HELD, timeout, cancel)
    }

    /// Release the lock
    ///
    /// Fails with `IllegalState` if the lock is not held.
    #[inline]
    pub fn unlock(&self) -> SyncResult<()> {
        self.sync.release(HELD)
    }

    /// Acquire and return a guard that unlocks on drop
    pub fn guard(&self) -> ExclusiveGuard<'_> {
        self.lock();
        ExclusiveGuard { lock: self }
    }

    pub fn new_condition(&self) -> Condition<ExclusiveStrategy> {
        Condition::new(self.sync.clone())
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.sync.state() == HELD
    }

    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.sync.is_held_exclusively()
    }

    #[inline]
    pub fn owner_id(&self) -> Option<u64> {
        self.sync.owner_id()
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.sync.queue_len()
    }

    #[inline]
    pub fn has_queued_threads(&self) -> bool {
        self.sync.has_queued_threads()
    }

    pub fn queued_thread_ids(&self) -> Vec<u64> {
        self.sync.queued_thread_ids()
    }
}

impl Default for ExclusiveLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds an `ExclusiveLock` until dropped
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ExclusiveGuard<'a> {
    lock: &'a ExclusiveLock,
}

impl ExclusiveGuard<'_> {
    /// The lock this guard holds
    #[inline]
    pub fn lock(&self) -> &ExclusiveLock {
        self.lock
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            error!(error = %e, "Guarded unlock failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyncError;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_strategy_decisions() {
        let s = ExclusiveStrategy;
        assert_eq!(s.try_acquire(FREE, 1, false), Some(HELD));
        assert_eq!(s.try_acquire(HELD, 1, true), None);
        assert_eq!(s.try_release(HELD, 1, false), Some(FREE));
        assert_eq!(s.try_release(FREE, 1, true), None);
    }

    #[test]
    fn test_lock_unlock_records_owner() {
        let lock = ExclusiveLock::new();
        lock.lock();
        assert!(lock.is_locked());
        assert!(lock.is_held_by_current_thread());
        assert_eq!(lock.owner_id(), Some(crate::sync::suspend::current_id()));

        lock.unlock().unwrap();
        assert!(!lock.is_locked());
        assert_eq!(lock.owner_id(), None);
    }

    #[test]
    fn test_double_unlock_is_illegal() {
        let lock = ExclusiveLock::new();
        lock.lock();
        lock.unlock().unwrap();

        assert!(matches!(lock.unlock(), Err(SyncError::IllegalState(_))));
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_try_lock_is_not_reentrant() {
        let lock = ExclusiveLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock().unwrap();
    }

    #[test]
    fn test_other_thread_sees_held_lock() {
        let lock = ExclusiveLock::new();
        lock.lock();

        let lock_clone = lock.clone();
        let (locked, held, acquired) = thread::spawn(move || {
            (
                lock_clone.is_locked(),
                lock_clone.is_held_by_current_thread(),
                lock_clone.try_lock(),
            )
        })
        .join()
        .unwrap();

        assert!(locked);
        assert!(!held);
        assert!(!acquired);
        lock.unlock().unwrap();
    }

    #[test]
    fn test_try_lock_for_times_out() {
        let lock = ExclusiveLock::new();
        lock.lock();

        let lock_clone = lock.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let result = lock_clone.try_lock_for(Duration::from_millis(50), None);
            (result, start.elapsed())
        });

        let (result, elapsed) = handle.join().unwrap();
        assert_eq!(result, Ok(false));
        assert!(elapsed >= Duration::from_millis(50));
        assert_eq!(lock.queue_len(), 0);
        lock.unlock().unwrap();
    }

    #[test]
    fn test_guard_unlocks_on_drop() {
        let lock = ExclusiveLock::new();
        {
            let guard = lock.guard();
            assert!(guard.lock().is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_lock_interruptibly_with_cancelled_token() {
        let lock = ExclusiveLock::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(lock.lock_interruptibly(&cancel), Err(SyncError::Interrupted));
        assert!(!lock.is_locked());
    }
}
