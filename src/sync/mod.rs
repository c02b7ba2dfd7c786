/*!
 * Synchronization Primitives
 *
 * Blocking synchronization built from scratch on a thread-suspension primitive:
 * - Queued synchronizer: CAS-driven state cell plus a FIFO wait queue, with
 *   the acquire decision supplied by a pluggable strategy
 * - Exclusive and reentrant locks over that synchronizer
 * - Condition variables that move waiters between lists
 * - A standalone FIFO mutex built directly on park/unpark
 * - A bounded producer/consumer channel
 *
 * # Architecture
 *
 * ```text
 * SuspensionToken (park/unpark permits)
 *   └─ WaitArena (index-linked wait nodes)
 *        └─ QueuedSynchronizer<S: AcquireStrategy>
 *             ├─ ExclusiveLock / ReentrantLock
 *             └─ Condition ── BoundedChannel
 * FifoMutex (tokens + explicit queue, no synchronizer)
 * ```
 *
 * # Cancellation
 *
 * Blocking calls take an explicit `CancelToken` instead of relying on a
 * per-thread interrupt flag.
 */

mod cancel;
mod channel;
mod condition;
mod config;
mod list;
mod locks;
mod queue;
mod synchronizer;
mod traits;

pub mod suspend;

pub use cancel::CancelToken;
pub use channel::BoundedChannel;
pub use condition::Condition;
pub use config::SyncConfig;
pub use list::LockedList;
pub use locks::{
    ExclusiveGuard, ExclusiveLock, ExclusiveStrategy, FifoMutex, ReentrantLock, ReentrantStrategy,
};
pub use queue::{ConditionId, NodeId, NodeLocation, NodeStatus, WaitArena, WaitNode};
pub use suspend::{ParkOutcome, SuspensionToken};
pub use synchronizer::QueuedSynchronizer;
pub use traits::AcquireStrategy;
