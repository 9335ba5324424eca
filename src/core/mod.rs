//! Worker pool, task queue and timer service.

pub mod error;
pub mod task_queue;
pub mod timer;
pub mod worker_pool;

pub use error::{AppResult, ConfigError, PoolError, TimerError};
pub use task_queue::{BoundedQueue, PoolState, QueueClosed};
pub use timer::{
    ScheduledEntry, Timer, TimerId, TimerRegistry, TimerService, TimerState, TimerStats,
};
pub use worker_pool::{PoolStats, TaskHandle, WorkerPool};
