/*!
 * Cancellation Tokens
 *
 * Explicit replacement for per-thread interruption. A token is passed into
 * blocking calls and checked at every suspension point; `cancel()` wakes every
 * thread currently parked under it.
 */

use super::suspend::SuspensionToken;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    parked: Mutex<Vec<SuspensionToken>>,
}

/// Shared cancellation flag
///
/// The flag is sticky: once cancelled it stays set until `clear` or `reset`.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every thread parked under this token
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let parked = self.inner.parked.lock();
        for token in parked.iter() {
            token.unpark();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Take the flag, returning whether it was set
    #[inline]
    pub fn clear(&self) -> bool {
        self.inner.cancelled.swap(false, Ordering::SeqCst)
    }

    #[inline]
    pub fn reset(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    /// Register `token` to be woken by `cancel` for the guard's lifetime
    ///
    /// Registration happens before the caller re-checks the flag, so a cancel
    /// racing with a park either is observed by the check or finds the token.
    pub(crate) fn register<'a>(&'a self, token: &SuspensionToken) -> Registration<'a> {
        self.inner.parked.lock().push(token.clone());
        Registration {
            owner: self,
            id: token.id(),
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("parked", &self.inner.parked.lock().len())
            .finish()
    }
}

/// Removes a parked thread from its token on drop
pub(crate) struct Registration<'a> {
    owner: &'a CancelToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut parked = self.owner.inner.parked.lock();
        if let Some(pos) = parked.iter().position(|t| t.id() == self.id) {
            parked.swap_remove(pos);
        }
    }
}
