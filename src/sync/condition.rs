/*!
 * Condition Variables
 *
 * Per-lock wait/signal built on the synchronizer's node arena. A waiter's
 * node sits on the condition list until a signal transfers it to the wait
 * queue, where it competes for the lock like any other queued caller.
 *
 * # Usage
 *
 * `wait` may return without the awaited predicate being true; always wait in
 * a loop that re-checks the predicate while holding the lock.
 */

use super::cancel::CancelToken;
use super::queue::{ConditionId, NodeId, NodeLocation, NodeStatus};
use super::suspend::{self, SuspensionToken};
use super::synchronizer::QueuedSynchronizer;
use super::traits::AcquireStrategy;
use crate::errors::{SyncError, SyncResult};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Condition variable bound to one synchronizer
pub struct Condition<S: AcquireStrategy> {
    sync: Arc<QueuedSynchronizer<S>>,
    id: ConditionId,
}

impl<S: AcquireStrategy> Condition<S> {
    pub(crate) fn new(sync: Arc<QueuedSynchronizer<S>>) -> Self {
        let id = sync.arena().add_condition();
        Self { sync, id }
    }

    #[inline]
    fn location(&self) -> NodeLocation {
        NodeLocation::Condition(self.id)
    }

    fn check_held(&self, operation: &str) -> SyncResult<()> {
        if self.sync.is_held_exclusively() {
            Ok(())
        } else {
            Err(SyncError::illegal_state(format!(
                "condition {} without holding the lock",
                operation
            )))
        }
    }

    /// Release the lock, wait for a signal, then re-acquire the lock
    ///
    /// Returns `Err(Interrupted)` if `cancel` fires before a signal arrives.
    /// The lock is held again on every return except `IllegalState`.
    pub fn wait(&self, cancel: Option<&CancelToken>) -> SyncResult<()> {
        self.wait_inner(None, cancel).map(|_| ())
    }

    /// Wait ignoring cancellation
    pub fn wait_uninterruptibly(&self) -> SyncResult<()> {
        self.wait_inner(None, None).map(|_| ())
    }

    /// Wait at most `timeout`; `Ok(false)` means the wait timed out
    pub fn wait_timeout(&self, timeout: Duration, cancel: Option<&CancelToken>) -> SyncResult<bool> {
        self.wait_inner(Instant::now().checked_add(timeout), cancel)
    }

    fn wait_inner(&self, deadline: Option<Instant>, cancel: Option<&CancelToken>) -> SyncResult<bool> {
        self.check_held("wait")?;
        let me = SuspensionToken::current();
        let id = self.sync.arena().push_back(self.location(), me.clone());

        let saved = match self.sync.fully_release() {
            Ok(saved) => saved,
            Err(e) => {
                self.sync.arena().remove(id);
                return Err(e);
            }
        };

        let mut outcome = Ok(true);
        loop {
            if self.is_transferred(id) {
                break;
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                if self.cancel_wait(id) {
                    debug!(thread = me.id(), "Condition wait interrupted");
                    outcome = Err(SyncError::Interrupted);
                }
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                if self.cancel_wait(id) {
                    trace!(thread = me.id(), "Condition wait timed out");
                    outcome = Ok(false);
                }
                break;
            }
            suspend::park_until(deadline, cancel);
        }

        // Re-acquisition ignores cancellation: the caller must get the lock back
        self.sync.wait_in_queue(id, saved, None, None)?;
        outcome
    }

    fn is_transferred(&self, id: NodeId) -> bool {
        self.sync.arena().node(id).location() == NodeLocation::WaitQueue
    }

    /// Move a still-waiting node to the wait queue as cancelled
    ///
    /// Returns false if a signal already transferred it.
    fn cancel_wait(&self, id: NodeId) -> bool {
        let mut arena = self.sync.arena();
        if arena.node(id).location() == NodeLocation::WaitQueue {
            return false;
        }
        arena.set_status(id, NodeStatus::Cancelled);
        arena.transfer(id);
        self.sync.publish_len(&arena);
        true
    }

    /// Transfer the longest-waiting node to the lock's wait queue
    ///
    /// No-op when nobody waits. The woken caller still has to win the lock.
    pub fn signal(&self) -> SyncResult<()> {
        self.check_held("signal")?;
        let mut arena = self.sync.arena();
        if let Some(id) = arena.head(self.location()) {
            arena.transfer(id);
            self.sync.publish_len(&arena);
            trace!(thread = arena.node(id).thread().id(), "Condition signaled");
        }
        Ok(())
    }

    /// Transfer every waiting node, preserving their order
    pub fn signal_all(&self) -> SyncResult<()> {
        self.check_held("signal_all")?;
        let mut arena = self.sync.arena();
        let mut moved = 0usize;
        while let Some(id) = arena.head(self.location()) {
            arena.transfer(id);
            moved += 1;
        }
        if moved > 0 {
            self.sync.publish_len(&arena);
            trace!(moved, "Condition signaled all");
        }
        Ok(())
    }

    /// Number of callers currently waiting for a signal
    pub fn waiter_count(&self) -> usize {
        self.sync.arena().len(self.location())
    }

    #[inline]
    pub fn has_waiters(&self) -> bool {
        self.waiter_count() > 0
    }
}

impl<S: AcquireStrategy> Drop for Condition<S> {
    fn drop(&mut self) {
        let mut arena = self.sync.arena();
        arena.remove_condition(self.id);
        self.sync.publish_len(&arena);
    }
}

impl<S: AcquireStrategy> fmt::Debug for Condition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("id", &self.id)
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
