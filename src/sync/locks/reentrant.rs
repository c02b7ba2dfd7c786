/*!
 * Reentrant Lock
 *
 * Second strategy over the same queued synchronizer: the owner may acquire
 * again, and the state counts outstanding holds.
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

/// Hold-counting acquire decision
#[derive(Debug, Default, Clone, Copy)]
pub struct ReentrantStrategy;

impl AcquireStrategy for ReentrantStrategy {
    fn try_acquire(&self, current: usize, arg: usize, held_by_caller: bool) -> Option<usize> {
        match current {
            0 => Some(arg),
            n if held_by_caller => n.checked_add(arg),
            _ => None,
        }
    }

    fn try_release(&self, current: usize, arg: usize, held_by_caller: bool) -> Option<usize> {
        if !held_by_caller {
            return None;
        }
        current.checked_sub(arg)
    }

    fn name(&self) -> &'static str {
        "reentrant"
    }
}

/// Mutual exclusion lock the owner may acquire repeatedly
///
/// Each `lock` must be matched by an `unlock` from the same thread.
#[derive(Debug, Clone)]
pub struct ReentrantLock {
    sync: Arc<QueuedSynchronizer<ReentrantStrategy>>,
}

impl ReentrantLock {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            sync: Arc::new(QueuedSynchronizer::with_config(ReentrantStrategy, config)),
        }
    }

    #[inline]
    pub fn lock(&self) {
        self.sync.acquire(1);
    }

    #[inline]
    pub fn lock_interruptibly(&self, cancel: &CancelToken) -> SyncResult<()> {
        self.sync.acquire_interruptibly(1, cancel)
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        self.sync.try_acquire(1)
    }

    #[inline]
    pub fn try_lock_for(&self, timeout: Duration, cancel: Option<&CancelToken>) -> SyncResult<bool> {
        self.sync.try_acquire_for(1, timeout, cancel)
    }

    /// Drop one hold; fails with `IllegalState` unless the caller owns the lock
    #[inline]
    pub fn unlock(&self) -> SyncResult<()> {
        self.sync.release(1)
    }

    /// Run `f` while holding the lock
    ///
    /// The hold is released even if `f` panics.
    pub fn with<F, R>(&self, f: F) -> SyncResult<R>
    where
        F: FnOnce() -> R,
    {
        self.lock();
        let hold = UnlockOnDrop { lock: self };
        let result = f();
        std::mem::forget(hold);
        self.unlock()?;
        Ok(result)
    }

    pub fn new_condition(&self) -> Condition<ReentrantStrategy> {
        Condition::new(self.sync.clone())
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.sync.state() != 0
    }

    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.sync.is_held_exclusively()
    }

    /// Holds by the calling thread (0 if another thread or nobody owns it)
    pub fn hold_count(&self) -> usize {
        if self.is_held_by_current_thread() {
            self.sync.state()
        } else {
            0
        }
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.sync.queue_len()
    }
}

/// Releases one hold of a `ReentrantLock` when unwinding out of `with`
struct UnlockOnDrop<'a> {
    lock: &'a ReentrantLock,
}

impl Drop for UnlockOnDrop<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            error!(error = %e, "Unlock after panic failed");
        }
    }
}

impl Default for ReentrantLock {
    fn default() -> Self {
        Self::new()
    }
}
