/*!
 * Synchronizer Configuration
 *
 * Runtime tuning for the queued synchronizer
 */

use serde::{Deserialize, Serialize};

/// Synchronizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Re-tries of `try_acquire` by the queue head before it parks
    ///
    /// Only the head spins, so spinning never reorders waiters.
    pub spin_limit: u32,
    /// Emit debug events when callers enqueue, time out or cancel
    pub trace_contention: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            spin_limit: 16,
            trace_contention: true,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for short critical sections
    pub const fn low_latency() -> Self {
        Self {
            spin_limit: 128,
            trace_contention: false,
        }
    }

    /// Park immediately once queued
    pub const fn no_spin() -> Self {
        Self {
            spin_limit: 0,
            trace_contention: true,
        }
    }
}
