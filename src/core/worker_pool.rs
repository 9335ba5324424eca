//! Worker pool with a fixed set of named OS threads.
//!
//! Tasks are closures submitted through [`WorkerPool::submit`]; each returns a
//! [`TaskHandle`] that resolves with the closure's return value, with
//! [`PoolError::TaskPanicked`](crate::core::PoolError::TaskPanicked) if it
//! panicked, or with [`PoolError::Closed`](crate::core::PoolError::Closed) if
//! the pool was shut down before the task ran.
//!
//! # Key Features
//!
//! - **Backpressure**: a bounded queue blocks `submit` instead of failing
//! - **Panic isolation**: a panicking task never takes its worker down
//! - **Pause/resume**: workers park without losing queued tasks
//! - **Draining or discarding shutdown**, idempotent, joins every worker
//!
//! # Example
//!
//! ```
//! use threadkit::core::WorkerPool;
//!
//! let pool = WorkerPool::new(2)?;
//! let handle = pool.submit(|| 6 * 7)?;
//! assert_eq!(handle.wait()?, 42);
//! pool.shutdown(true);
//! # Ok::<(), threadkit::core::PoolError>(())
//! ```

mod handle;
mod pool;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub use handle::TaskHandle;
pub use pool::WorkerPool;

/// Statistics about pool utilization. Eventually consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Worker threads currently alive.
    pub worker_count: usize,
    /// Tasks currently executing.
    pub active_tasks: u64,
    /// Tasks waiting in the queue.
    pub queued_tasks: u64,
    /// Tasks accepted by `submit`.
    pub submitted_tasks: u64,
    /// Tasks that ran to completion.
    pub completed_tasks: u64,
    /// Tasks that panicked.
    pub failed_tasks: u64,
    /// Submissions rejected because the pool was closed.
    pub rejected_tasks: u64,
    /// Queued tasks dropped by a non-draining shutdown.
    pub discarded_tasks: u64,
}

/// Internal counters for pool statistics.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub rejected_tasks: AtomicU64,
    pub discarded_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, queued_tasks: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: queued_tasks as u64,
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
            discarded_tasks: self.discarded_tasks.load(Ordering::Relaxed),
        }
    }

    /// Record the outcome of one executed task.
    pub fn record_outcome(&self, succeeded: bool) {
        if succeeded {
            self.completed_tasks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_tasks.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.worker_count, 0);
        assert_eq!(stats.active_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
    }

    #[test]
    fn test_pool_counters_snapshot() {
        let counters = PoolCounters::default();
        counters.submitted_tasks.fetch_add(10, Ordering::Relaxed);
        counters.record_outcome(true);
        counters.record_outcome(true);
        counters.record_outcome(false);

        let stats = counters.snapshot(4, 7);
        assert_eq!(stats.worker_count, 4);
        assert_eq!(stats.queued_tasks, 7);
        assert_eq!(stats.submitted_tasks, 10);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.failed_tasks, 1);
    }
}
