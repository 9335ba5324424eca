//! Build pools, timer services and runtime contexts from configuration.

use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;

use crate::config::{RuntimeConfig, TimerServiceConfig, WorkerPoolConfig};
use crate::core::{AppResult, PoolError, TimerError, TimerService, WorkerPool};
use crate::runtime::Context;

/// Start a worker pool from its configuration section.
///
/// # Errors
///
/// Propagates [`PoolError`] from validation or thread creation.
pub fn build_worker_pool(cfg: &WorkerPoolConfig) -> Result<WorkerPool, PoolError> {
    WorkerPool::with_config(cfg.clone())
}

/// Start a timer service from its configuration section.
///
/// # Errors
///
/// Propagates [`TimerError`] from validation or thread creation.
pub fn build_timer_service(cfg: &TimerServiceConfig) -> Result<TimerService, TimerError> {
    TimerService::with_config(cfg.clone())
}

/// Validate `cfg` and start both components.
///
/// If the timer service fails to start, the already-running pool is shut
/// down before the error is returned.
///
/// # Errors
///
/// Returns an error with context naming the component that failed.
pub fn build_context(cfg: &RuntimeConfig) -> AppResult<Context> {
    cfg.validate().context("runtime configuration invalid")?;

    let pool = build_worker_pool(&cfg.pool).context("failed to start worker pool")?;
    let timers = match build_timer_service(&cfg.timers) {
        Ok(timers) => timers,
        Err(e) => {
            pool.shutdown(false);
            return Err(e).context("failed to start timer service");
        }
    };

    info!(
        workers = pool.thread_count(),
        queue_capacity = cfg.pool.queue_capacity,
        "Runtime context ready"
    );
    Ok(Context::new(Arc::new(pool), Arc::new(timers)))
}
