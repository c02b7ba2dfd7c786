/*!
 * Lock Implementations
 *
 * - Exclusive (non-reentrant) lock over the queued synchronizer
 * - Reentrant lock over the same synchronizer
 * - FIFO mutex built directly on suspension tokens
 */

mod exclusive;
mod fifo;
mod reentrant;

// Re-export public API
pub use exclusive::{ExclusiveGuard, ExclusiveLock, ExclusiveStrategy};
pub use fifo::FifoMutex;
pub use reentrant::{ReentrantLock, ReentrantStrategy};
