/*!
 * Queued Synchronizer
 *
 * Generic blocking acquire/release engine. An integer state cell is mutated
 * only by compare-and-swap; callers that cannot acquire immediately join a
 * FIFO wait queue and park until they reach the head and win the state.
 *
 * # Fairness
 *
 * Strict FIFO. A caller may take the fast path only when nobody is queued
 * (or it already owns the resource), and a queued caller may only attempt
 * the state while it is the head. Every wakeup re-checks queue position.
 *
 * # Wakeups
 *
 * A release that frees the resource unparks the current head. Park permits
 * persist, so a head that loses the race with `release` between its failed
 * attempt and its park still returns from the park immediately. A head that
 * abandons the queue hands the wakeup to its successor.
 */

use super::cancel::CancelToken;
use super::config::SyncConfig;
use super::queue::{NodeId, NodeLocation, NodeStatus, WaitArena};
use super::suspend::{self, current_id, SuspensionToken};
use super::traits::AcquireStrategy;
use crate::errors::{SyncError, SyncResult};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Owner value meaning "nobody"
const NO_OWNER: u64 = 0;

/// Blocking synchronizer parameterized by an acquire strategy
pub struct QueuedSynchronizer<S: AcquireStrategy> {
    state: AtomicUsize,
    owner: AtomicU64,
    /// Mirror of the wait queue length, read by the lock-free fast path
    queued: AtomicUsize,
    arena: Mutex<WaitArena>,
    strategy: S,
    config: SyncConfig,
}

impl<S: AcquireStrategy> QueuedSynchronizer<S> {
    pub fn new(strategy: S) -> Self {
        Self::with_config(strategy, SyncConfig::default())
    }

    pub fn with_config(strategy: S, config: SyncConfig) -> Self {
        Self {
            state: AtomicUsize::new(0),
            owner: AtomicU64::new(NO_OWNER),
            queued: AtomicUsize::new(0),
            arena: Mutex::new(WaitArena::new()),
            strategy,
            config,
        }
    }

    #[inline]
    pub fn state(&self) -> usize {
        self.state.load(Ordering::Acquire)
    }

    #[inline]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    #[inline]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Identity of the recorded owner, if any
    pub fn owner_id(&self) -> Option<u64> {
        match self.owner.load(Ordering::Acquire) {
            NO_OWNER => None,
            id => Some(id),
        }
    }

    #[inline]
    fn held_by(&self, me: u64) -> bool {
        self.owner.load(Ordering::Relaxed) == me
    }

    /// Whether the calling thread holds the resource
    pub fn is_held_exclusively(&self) -> bool {
        self.strategy
            .is_held_exclusively(self.state(), self.held_by(current_id()))
    }

    /// Single decision against the state cell; never consults the queue
    ///
    /// The CAS retry only spans one memory operation: a lost race re-reads
    /// the state and asks the strategy again.
    fn try_acquire_state(&self, arg: usize, me: u64) -> bool {
        let held = self.held_by(me);
        loop {
            let current = self.state.load(Ordering::Acquire);
            let Some(next) = self.strategy.try_acquire(current, arg, held) else {
                return false;
            };
            if self
                .state
                .compare_exchange_weak(current, next, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                if current == 0 {
                    self.owner.store(me, Ordering::Relaxed);
                }
                return true;
            }
        }
    }

    /// Non-blocking acquire that respects queued waiters
    pub fn try_acquire(&self, arg: usize) -> bool {
        let me = current_id();
        (self.queued.load(Ordering::Acquire) == 0 || self.held_by(me))
            && self.try_acquire_state(arg, me)
    }

    /// Acquire, blocking as long as necessary
    pub fn acquire(&self, arg: usize) {
        let result = self.acquire_queued(arg, None, None);
        debug_assert!(result.is_ok(), "uninterruptible acquire cannot fail");
    }

    /// Acquire, failing with `Interrupted` if `cancel` fires while queued
    pub fn acquire_interruptibly(&self, arg: usize, cancel: &CancelToken) -> SyncResult<()> {
        if cancel.is_cancelled() {
            return Err(SyncError::Interrupted);
        }
        self.acquire_queued(arg, None, Some(cancel))
    }

    /// Acquire within `timeout`
    ///
    /// Returns `Ok(false)` when the deadline passes and `Err(Interrupted)` if
    /// `cancel` fires first.
    pub fn try_acquire_for(
        &self,
        arg: usize,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> SyncResult<bool> {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(SyncError::Interrupted);
        }
        let deadline = Instant::now().checked_add(timeout);
        match self.acquire_queued(arg, deadline, cancel) {
            Ok(()) => Ok(true),
            Err(SyncError::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn acquire_queued(
        &self,
        arg: usize,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> SyncResult<()> {
        let me = SuspensionToken::current();
        if self.try_acquire(arg) {
            return Ok(());
        }

        let id = {
            let mut arena = self.arena.lock();
            if (arena.is_empty(NodeLocation::WaitQueue) || self.held_by(me.id()))
                && self.try_acquire_state(arg, me.id())
            {
                return Ok(());
            }
            let id = arena.push_back(NodeLocation::WaitQueue, me.clone());
            self.publish_len(&arena);
            id
        };

        if self.config.trace_contention {
            debug!(
                thread = me.id(),
                strategy = self.strategy.name(),
                queued = self.queue_len(),
                "Caller enqueued"
            );
        }

        self.wait_in_queue(id, arg, deadline, cancel)
    }

    /// Park node `id` until it is head and wins the state
    ///
    /// On cancellation or timeout the node is unlinked and the matching error
    /// is returned; the resource is never held on an error return.
    pub(crate) fn wait_in_queue(
        &self,
        id: NodeId,
        arg: usize,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> SyncResult<()> {
        let me = current_id();
        let mut spins = 0;

        loop {
            let is_head = {
                let mut arena = self.arena.lock();
                let is_head = arena.head(NodeLocation::WaitQueue) == Some(id);
                if is_head && self.try_acquire_state(arg, me) {
                    let node = arena.remove(id);
                    self.publish_len(&arena);
                    if self.config.trace_contention {
                        match node.status() {
                            NodeStatus::Waiting => trace!(thread = me, "Queued caller acquired"),
                            NodeStatus::Signaled => {
                                trace!(thread = me, "Signaled waiter reacquired")
                            }
                            NodeStatus::Cancelled => {
                                debug!(thread = me, "Abandoned condition waiter reacquired")
                            }
                        }
                    }
                    return Ok(());
                }
                is_head
            };

            if cancel.is_some_and(CancelToken::is_cancelled) {
                self.abandon(id);
                if self.config.trace_contention {
                    debug!(thread = me, "Queued acquire interrupted");
                }
                return Err(SyncError::Interrupted);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.abandon(id);
                if self.config.trace_contention {
                    debug!(thread = me, "Queued acquire timed out");
                }
                return Err(SyncError::Timeout);
            }

            if is_head && spins < self.config.spin_limit {
                spins += 1;
                std::hint::spin_loop();
                continue;
            }

            suspend::park_until(deadline, cancel);
        }
    }

    /// Unlink an abandoned node, passing a pending wakeup to the new head
    fn abandon(&self, id: NodeId) {
        let successor = {
            let mut arena = self.arena.lock();
            let was_head = arena.head(NodeLocation::WaitQueue) == Some(id);
            arena.set_status(id, NodeStatus::Cancelled);
            arena.remove(id);
            self.publish_len(&arena);
            if was_head {
                arena
                    .head(NodeLocation::WaitQueue)
                    .map(|next| arena.node(next).thread().clone())
            } else {
                None
            }
        };

        if let Some(thread) = successor {
            thread.unpark();
        }
    }

    /// Release `arg` units, waking the head if the resource became free
    pub fn release(&self, arg: usize) -> SyncResult<()> {
        let me = current_id();
        let held = self.held_by(me);

        let next = loop {
            let current = self.state.load(Ordering::Acquire);
            let Some(next) = self.strategy.try_release(current, arg, held) else {
                warn!(
                    thread = me,
                    state = current,
                    strategy = self.strategy.name(),
                    "Release of a resource the caller does not hold"
                );
                return Err(SyncError::illegal_state(format!(
                    "release of {} by thread {} with state {}",
                    self.strategy.name(),
                    me,
                    current
                )));
            };
            if next == 0 {
                self.owner.store(NO_OWNER, Ordering::Relaxed);
            }
            if self
                .state
                .compare_exchange(current, next, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                break next;
            }
        };

        if next == 0 {
            self.wake_head();
        }
        Ok(())
    }

    fn wake_head(&self) {
        let head = {
            let arena = self.arena.lock();
            arena
                .head(NodeLocation::WaitQueue)
                .map(|id| arena.node(id).thread().clone())
        };
        if let Some(thread) = head {
            trace!(thread = thread.id(), "Waking queue head");
            thread.unpark();
        }
    }

    /// Release everything the caller holds, returning the saved state
    pub(crate) fn fully_release(&self) -> SyncResult<usize> {
        let saved = self.state();
        self.release(saved)?;
        Ok(saved)
    }

    pub(crate) fn arena(&self) -> MutexGuard<'_, WaitArena> {
        self.arena.lock()
    }

    /// Refresh the fast-path length mirror; caller holds the arena lock
    pub(crate) fn publish_len(&self, arena: &WaitArena) {
        self.queued
            .store(arena.len(NodeLocation::WaitQueue), Ordering::Release);
    }

    /// Approximate number of queued callers
    #[inline]
    pub fn queue_len(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    #[inline]
    pub fn has_queued_threads(&self) -> bool {
        self.queue_len() > 0
    }

    /// Identities of queued callers, head first
    pub fn queued_thread_ids(&self) -> Vec<u64> {
        let arena = self.arena.lock();
        arena
            .iter(NodeLocation::WaitQueue)
            .map(|id| arena.node(id).thread().id())
            .collect()
    }
}

impl<S: AcquireStrategy> fmt::Debug for QueuedSynchronizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedSynchronizer")
            .field("strategy", &self.strategy.name())
            .field("state", &self.state())
            .field("owner", &self.owner_id())
            .field("queued", &self.queue_len())
            .finish()
    }
}
