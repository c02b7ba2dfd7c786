/*!
 * FIFO Mutex
 *
 * Minimal fair lock built straight on suspension tokens, without the queued
 * synchronizer: an atomic `locked` flag plus an explicit queue of waiting
 * threads. Only the thread at the head of the queue may take the flag, and
 * `unlock` wakes exactly that thread.
 *
 * # Cancellation
 *
 * `lock` never aborts. A cancellation observed while waiting is remembered
 * and the wait continues without watching the token. The token itself stays
 * set, so other callers sharing it still see the cancellation.
 */

use crate::errors::{SyncError, SyncResult};
use crate::sync::cancel::CancelToken;
use crate::sync::suspend::{self, SuspensionToken};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// FIFO-fair mutual exclusion lock
#[derive(Debug, Default)]
pub struct FifoMutex {
    locked: AtomicBool,
    waiters: Mutex<VecDeque<SuspensionToken>>,
}

impl FifoMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is acquired, in arrival order
    pub fn lock(&self) {
        self.lock_inner(None);
    }

    /// Like `lock`, deferring any cancellation of `cancel` until acquired
    ///
    /// Returns true if `cancel` was observed cancelled during the wait. The
    /// token is left untouched.
    pub fn lock_deferring(&self, cancel: &CancelToken) -> bool {
        self.lock_inner(Some(cancel))
    }

    fn lock_inner(&self, cancel: Option<&CancelToken>) -> bool {
        let me = SuspensionToken::current();
        self.waiters.lock().push_back(me.clone());

        let mut was_cancelled = cancel.is_some_and(CancelToken::is_cancelled);
        while !self.is_head(&me)
            || self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            // Once cancellation is seen, stop watching the token so the park
            // blocks again without consuming the flag
            let watch = if was_cancelled { None } else { cancel };
            suspend::park_until(None, watch);
            if !was_cancelled && cancel.is_some_and(CancelToken::is_cancelled) {
                debug!(thread = me.id(), "Cancellation deferred by FIFO lock");
                was_cancelled = true;
            }
        }

        self.waiters.lock().pop_front();
        was_cancelled
    }

    fn is_head(&self, me: &SuspensionToken) -> bool {
        self.waiters.lock().front() == Some(me)
    }

    /// Acquire only if free and nobody is waiting
    pub fn try_lock(&self) -> bool {
        let waiters = self.waiters.lock();
        waiters.is_empty()
            && self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Release the lock and wake the head waiter
    pub fn unlock(&self) -> SyncResult<()> {
        if !self.locked.swap(false, Ordering::Release) {
            warn!("Unlock of a FIFO mutex that is not locked");
            return Err(SyncError::illegal_state("unlock of an unlocked FIFO mutex"));
        }
        let head = self.waiters.lock().front().cloned();
        if let Some(thread) = head {
            thread.unpark();
        }
        Ok(())
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Number of threads queued, including one that is about to acquire
    pub fn queue_len(&self) -> usize {
        self.waiters.lock().len()
    }
}
