/*!
 * Synchronizer Traits
 *
 * The queueing engine knows how to block, wake and order callers; it does not
 * know what "acquired" means. That decision is supplied by an
 * `AcquireStrategy`, so exclusive and reentrant locks share one engine.
 *
 * Strategies are pure functions of the observed state: they propose the next
 * state and the synchronizer installs it with a compare-and-swap.
 */

/// Exclusive-mode acquire/release decision
///
/// # Contract
///
/// - `try_acquire` returns `Some(next)` if the caller may move the state from
///   `current` to `next`, `None` if it must wait.
/// - `try_release` returns `Some(next)` for a legal release, `None` if the
///   caller does not hold what it is releasing.
/// - The resource is free again exactly when the installed state is 0.
pub trait AcquireStrategy: Send + Sync {
    /// Decide an acquire of `arg` units against `current`
    ///
    /// `held_by_caller` is true when the calling thread is the recorded owner.
    fn try_acquire(&self, current: usize, arg: usize, held_by_caller: bool) -> Option<usize>;

    /// Decide a release of `arg` units against `current`
    fn try_release(&self, current: usize, arg: usize, held_by_caller: bool) -> Option<usize>;

    /// Whether the caller holds the resource exclusively
    fn is_held_exclusively(&self, current: usize, held_by_caller: bool) -> bool {
        current != 0 && held_by_caller
    }

    /// Get strategy name for debugging
    fn name(&self) -> &'static str;
}
