/*!
 * Queued Sync Library
 * Blocking synchronization primitives built on a queued synchronizer
 */

pub mod demo;
pub mod errors;
pub mod monitoring;
pub mod sync;

// Re-exports
pub use errors::*;
pub use monitoring::init_tracing;
pub use sync::{
    BoundedChannel, CancelToken, Condition, ExclusiveLock, FifoMutex, LockedList,
    QueuedSynchronizer, ReentrantLock, SyncConfig,
};
