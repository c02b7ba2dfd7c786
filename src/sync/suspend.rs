/*!
 * Thread Suspension Tokens
 *
 * Permit-based park/unpark built on parking_lot_core. Every thread owns one
 * token; `unpark` grants a single permit that makes the owner's next (or
 * current) `park` return. Permits do not stack.
 *
 * # Design
 *
 * The parking key is the address of the token's shared permit cell, which is
 * stable for as long as any handle to the token is alive. The validate
 * callback runs under the parking bucket lock, so a permit published before
 * `unpark_one` is always observed either by validate or by the wakeup.
 */

use super::cancel::CancelToken;
use parking_lot_core::{park, unpark_one, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const EMPTY: u8 = 0;
const NOTIFIED: u8 = 1;

/// Identity 0 is reserved for "no thread"
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: SuspensionToken = SuspensionToken::new();
}

struct Permit {
    state: AtomicU8,
    id: u64,
}

/// Why a park call returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkOutcome {
    /// A permit was consumed
    Unparked,
    /// The deadline passed without a permit
    TimedOut,
    /// The cancellation token fired
    Cancelled,
}

/// Handle to a thread's suspension permit
///
/// Cloning the handle is cheap; all clones refer to the same thread.
#[derive(Clone)]
pub struct SuspensionToken {
    inner: Arc<Permit>,
}

impl SuspensionToken {
    fn new() -> Self {
        Self {
            inner: Arc::new(Permit {
                state: AtomicU8::new(EMPTY),
                id: NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed),
            }),
        }
    }

    /// Token of the calling thread
    #[inline]
    pub fn current() -> Self {
        CURRENT.with(|token| token.clone())
    }

    /// Process-unique identity of the owning thread (never 0)
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Grant one permit to the owning thread, waking it if parked
    pub fn unpark(&self) {
        if self.inner.state.swap(NOTIFIED, Ordering::Release) == NOTIFIED {
            return;
        }
        // SAFETY: the key is the address of a live Arc allocation held by
        // `self`, and the callback does not touch the parking lot.
        unsafe {
            unpark_one(self.key(), |_| DEFAULT_UNPARK_TOKEN);
        }
    }

    /// Consume a pending permit without blocking
    #[inline]
    fn try_consume(&self) -> bool {
        self.inner
            .state
            .compare_exchange(NOTIFIED, EMPTY, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn park_inner(&self, deadline: Option<Instant>, cancel: Option<&CancelToken>) -> ParkOutcome {
        let _registration = cancel.map(|token| token.register(self));

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return ParkOutcome::Cancelled;
            }
            if self.try_consume() {
                return ParkOutcome::Unparked;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return ParkOutcome::TimedOut;
            }

            let state = &self.inner.state;
            // Any return (unparked, timed out, invalid, stray wakeup) loops
            // back to re-check cancellation, the permit and the deadline.
            // SAFETY: the key is the address of the permit cell owned by this
            // token; none of the callbacks call back into the parking lot.
            unsafe {
                park(
                    self.key(),
                    || state.load(Ordering::Acquire) != NOTIFIED,
                    || {},
                    |_, _| {},
                    DEFAULT_PARK_TOKEN,
                    deadline,
                );
            }
        }
    }
}

impl PartialEq for SuspensionToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SuspensionToken {}

impl fmt::Debug for SuspensionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspensionToken")
            .field("id", &self.inner.id)
            .field("notified", &(self.inner.state.load(Ordering::Relaxed) == NOTIFIED))
            .finish()
    }
}

/// Identity of the calling thread
#[inline]
pub fn current_id() -> u64 {
    CURRENT.with(|token| token.id())
}

/// Block the calling thread until a permit is available
pub fn park_current() {
    let token = SuspensionToken::current();
    token.park_inner(None, None);
}

/// Block until a permit arrives or `timeout` elapses
pub fn park_timeout(timeout: Duration) -> ParkOutcome {
    let token = SuspensionToken::current();
    token.park_inner(Instant::now().checked_add(timeout), None)
}

/// Block until a permit arrives, the deadline passes, or `cancel` fires
///
/// Cancellation wins over a pending permit and leaves the permit in place, so
/// the next park may return early. Callers always re-check their condition.
pub fn park_until(deadline: Option<Instant>, cancel: Option<&CancelToken>) -> ParkOutcome {
    let token = SuspensionToken::current();
    token.park_inner(deadline, cancel)
}

/// Grant one permit to `token`'s thread
#[inline]
pub fn unpark(token: &SuspensionToken) {
    token.unpark();
}
