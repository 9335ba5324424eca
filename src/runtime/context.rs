//! Shared runtime context.

use std::sync::Arc;

use tracing::info;

use crate::core::{TimerService, WorkerPool};

/// A worker pool and a timer service that live and shut down together.
///
/// Cloning is cheap; clones share the same pool and service.
#[derive(Debug, Clone)]
pub struct Context {
    pool: Arc<WorkerPool>,
    timers: Arc<TimerService>,
}

impl Context {
    /// Bundle already-running components.
    #[must_use]
    pub const fn new(pool: Arc<WorkerPool>, timers: Arc<TimerService>) -> Self {
        Self { pool, timers }
    }

    /// The worker pool.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The timer service.
    #[must_use]
    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    /// Shared handle to the worker pool.
    #[must_use]
    pub fn pool_handle(&self) -> Arc<WorkerPool> {
        Arc::clone(&self.pool)
    }

    /// Shared handle to the timer service.
    #[must_use]
    pub fn timers_handle(&self) -> Arc<TimerService> {
        Arc::clone(&self.timers)
    }

    /// Stop the timer service first so no callback can submit into a
    /// closing pool, then shut the pool down.
    pub fn shutdown(&self, drain: bool) {
        info!(drain = drain, "Shutting down runtime context");
        self.timers.shutdown();
        self.pool.shutdown(drain);
    }
}
