/*!
 * Locked List
 * Thread-safe list guarded by a `ReentrantLock`
 */

use crate::errors::{SyncError, SyncResult};
use crate::sync::locks::ReentrantLock;
use std::cell::{Cell, UnsafeCell};

/// Vec-backed list whose every operation runs under one reentrant lock
///
/// Element code (`PartialEq`, `Clone`) runs while the list is borrowed. If it
/// calls back into the same list, that nested call fails with `IllegalState`.
pub struct LockedList<T> {
    lock: ReentrantLock,
    /// Set while a closure holds the borrow of `items`; only touched under `lock`
    in_use: Cell<bool>,
    items: UnsafeCell<Vec<T>>,
}

// SAFETY: `items` and `in_use` are only reached inside `ReentrantLock::with`.
// The reentrant lock admits the owner again, so `in_use` refuses a second
// borrow of `items` from the same thread.
unsafe impl<T: Send> Send for LockedList<T> {}
unsafe impl<T: Send> Sync for LockedList<T> {}

/// Clears the in-use flag even if element code panics
struct Borrowed<'a>(&'a Cell<bool>);

impl Drop for Borrowed<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T> LockedList<T> {
    pub fn new() -> Self {
        Self {
            lock: ReentrantLock::new(),
            in_use: Cell::new(false),
            items: UnsafeCell::new(Vec::new()),
        }
    }

    fn with_items<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> SyncResult<R> {
        self.lock.with(|| {
            if self.in_use.replace(true) {
                return Err(SyncError::illegal_state(
                    "locked list re-entered from element code",
                ));
            }
            let _borrowed = Borrowed(&self.in_use);
            // SAFETY: the lock is held and `in_use` guarantees this is the
            // only live borrow of `items`.
            Ok(f(unsafe { &mut *self.items.get() }))
        })?
    }

    pub fn add(&self, item: T) -> SyncResult<()> {
        self.with_items(|items| items.push(item))
    }

    /// Remove the first element equal to `item`; returns whether one was found
    pub fn remove(&self, item: &T) -> SyncResult<bool>
    where
        T: PartialEq,
    {
        self.with_items(|items| match items.iter().position(|x| x == item) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        })
    }

    pub fn get(&self, index: usize) -> SyncResult<Option<T>>
    where
        T: Clone,
    {
        self.with_items(|items| items.get(index).cloned())
    }

    pub fn len(&self) -> SyncResult<usize> {
        self.with_items(|items| items.len())
    }

    pub fn is_empty(&self) -> SyncResult<bool> {
        self.with_items(|items| items.is_empty())
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> SyncResult<Vec<T>>
    where
        T: Clone,
    {
        self.with_items(|items| items.clone())
    }
}

impl<T> Default for LockedList<T> {
    fn default() -> Self {
        Self::new()
    }
}
