/*!
 * Bounded Channel
 *
 * Producer/consumer queue coordinated by an `ExclusiveLock` and two
 * conditions: producers wait on "not full", consumers on "not empty".
 *
 * # Wakeups
 *
 * Both sides `signal_all` after changing the queue. Every waiter re-checks
 * its predicate in a loop, so extra wakeups cost a re-check and never a
 * wrong delivery.
 */

use crate::errors::{SyncError, SyncResult};
use crate::sync::cancel::CancelToken;
use crate::sync::condition::Condition;
use crate::sync::locks::{ExclusiveLock, ExclusiveStrategy};
use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Fixed-capacity FIFO channel
pub struct BoundedChannel<T> {
    lock: ExclusiveLock,
    not_full: Condition<ExclusiveStrategy>,
    not_empty: Condition<ExclusiveStrategy>,
    items: UnsafeCell<VecDeque<T>>,
    /// Mirror of `items.len()` for lock-free reads
    count: AtomicUsize,
    capacity: usize,
}

// SAFETY: `items` is only touched through `with_items`, which requires the
// channel lock to be held by the calling thread.
unsafe impl<T: Send> Send for BoundedChannel<T> {}
unsafe impl<T: Send> Sync for BoundedChannel<T> {}

impl<T> BoundedChannel<T> {
    /// Create a channel holding at most `capacity` items
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "channel capacity must be positive");
        let lock = ExclusiveLock::new();
        Self {
            not_full: lock.new_condition(),
            not_empty: lock.new_condition(),
            lock,
            items: UnsafeCell::new(VecDeque::with_capacity(capacity)),
            count: AtomicUsize::new(0),
            capacity,
        }
    }

    fn with_items<R>(&self, f: impl FnOnce(&mut VecDeque<T>) -> R) -> R {
        debug_assert!(self.lock.is_held_by_current_thread());
        // SAFETY: the channel lock is held, so no other thread can reach
        // `items`, and the borrow ends before any condition wait.
        let items = unsafe { &mut *self.items.get() };
        let result = f(items);
        self.count.store(items.len(), Ordering::Release);
        result
    }

    /// Insert at the tail, waiting while the channel is full
    pub fn put(&self, item: T) -> SyncResult<()> {
        self.put_inner(item, None)
    }

    /// Like `put`, failing with `Interrupted` if `cancel` fires while waiting
    pub fn put_cancellable(&self, item: T, cancel: &CancelToken) -> SyncResult<()> {
        self.put_inner(item, Some(cancel))
    }

    fn put_inner(&self, item: T, cancel: Option<&CancelToken>) -> SyncResult<()> {
        let _guard = self.lock.guard();
        while self.with_items(|items| items.len()) == self.capacity {
            self.not_full.wait(cancel)?;
        }
        self.with_items(|items| items.push_back(item));
        self.not_empty.signal_all()
    }

    /// Insert without waiting; hands the item back if the channel is full
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let _guard = self.lock.guard();
        if self.with_items(|items| items.len()) == self.capacity {
            return Err(item);
        }
        self.with_items(|items| items.push_back(item));
        // Holding the lock, so signalling cannot fail
        let _ = self.not_empty.signal_all();
        Ok(())
    }

    /// Remove from the head, waiting while the channel is empty
    pub fn take(&self) -> SyncResult<T> {
        self.take_inner(None, None)?.ok_or(SyncError::Timeout)
    }

    /// Like `take`, failing with `Interrupted` if `cancel` fires while waiting
    pub fn take_cancellable(&self, cancel: &CancelToken) -> SyncResult<T> {
        self.take_inner(None, Some(cancel))?
            .ok_or(SyncError::Timeout)
    }

    /// Remove from the head, waiting at most `timeout`
    pub fn take_timeout(&self, timeout: Duration) -> SyncResult<Option<T>> {
        self.take_inner(Instant::now().checked_add(timeout), None)
    }

    fn take_inner(
        &self,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> SyncResult<Option<T>> {
        let _guard = self.lock.guard();
        loop {
            if let Some(item) = self.with_items(|items| items.pop_front()) {
                self.not_full.signal_all()?;
                return Ok(Some(item));
            }
            match deadline {
                None => self.not_empty.wait(cancel)?,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() || !self.not_empty.wait_timeout(remaining, cancel)? {
                        // Timed out; one last look before giving up
                        let item = self.with_items(|items| items.pop_front());
                        if item.is_some() {
                            self.not_full.signal_all()?;
                        }
                        return Ok(item);
                    }
                }
            }
        }
    }

    /// Remove without waiting
    pub fn try_take(&self) -> Option<T> {
        let _guard = self.lock.guard();
        let item = self.with_items(|items| items.pop_front());
        if item.is_some() {
            let _ = self.not_full.signal_all();
        }
        item
    }

    /// Wake one consumer without producing anything
    ///
    /// The woken consumer re-checks and waits again if the channel is empty.
    pub fn signal_not_empty(&self) -> SyncResult<()> {
        let _guard = self.lock.guard();
        self.not_empty.signal()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consumers currently waiting for an item
    pub fn waiting_consumers(&self) -> usize {
        self.not_empty.waiter_count()
    }

    /// Producers currently waiting for space
    pub fn waiting_producers(&self) -> usize {
        self.not_full.waiter_count()
    }
}

impl<T> fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
