//! Thread-backed `WorkerPool`.
//!
//! # Design Principles
//!
//! - **No polling**: workers block in [`BoundedQueue::pop`]; producers block in
//!   [`BoundedQueue::push`] when the queue is full
//! - **One lock for admission**: the closed check and the insertion happen
//!   under the queue lock, so a racing shutdown rejects instead of dropping
//! - **No lock held while user code runs**

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::error::panic_message;
use crate::core::task_queue::{BoundedQueue, PoolState, QueueClosed};
use crate::core::PoolError;
use crate::{Mutex, Semaphore};

use super::handle::task_channel;
use super::{PoolCounters, PoolStats, TaskHandle};

/// Type-erased task body. Records its own outcome in the pool counters
/// before resolving the handle.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// A task waiting in the queue.
struct QueuedTask {
    id: u64,
    run: Job,
}

/// State shared between the pool handle and its workers.
struct PoolShared {
    queue: BoundedQueue<QueuedTask>,
    counters: PoolCounters,
    live_workers: AtomicUsize,
}

/// Fixed-size pool of worker threads fed from one bounded FIFO queue.
///
/// # Design
///
/// - Tasks are dispatched in submission order; execution is parallel
/// - `Running ⇄ Paused` is repeatable, `Closed` is terminal
/// - Dropping the pool performs `shutdown(true)`
pub struct WorkerPool {
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Queue, counters and liveness shared with workers.
    shared: Arc<PoolShared>,

    /// Worker thread handles, drained by `shutdown`.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Task ID counter.
    task_id_counter: AtomicU64,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("thread_count", &self.thread_count())
            .field("task_count", &self.task_count())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a pool with `worker_count` threads and an unbounded queue.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Spawn` if a worker thread cannot be created.
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        Self::with_config(WorkerPoolConfig::new().with_worker_count(worker_count))
    }

    /// Create a pool from `config`.
    ///
    /// Spawns `config.worker_count` named threads and returns once every one
    /// of them is running its loop. If any thread fails to spawn, the ones
    /// already started are shut down and joined before the error is returned.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker thread cannot be created
    pub fn with_config(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config
            .validate()
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?;

        let shared = Arc::new(PoolShared {
            queue: BoundedQueue::new(config.queue_capacity),
            counters: PoolCounters::default(),
            live_workers: AtomicUsize::new(0),
        });
        let started = Arc::new(Semaphore::new(0));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            match spawn_worker(worker_id, &config, Arc::clone(&shared), Arc::clone(&started)) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    warn!(worker_id = worker_id, error = %e, "Failed to spawn worker thread");
                    shared.queue.close(false);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        for _ in 0..workers.len() {
            started.wait();
        }

        info!(
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            "WorkerPool initialized"
        );

        Ok(Self {
            config,
            shared,
            workers: Mutex::new(workers),
            task_id_counter: AtomicU64::new(0),
        })
    }

    /// Submit a task and return a handle to its result.
    ///
    /// Arguments are passed by capturing them in the closure. Blocks only
    /// while the queue is at capacity. A pool with zero workers runs the task
    /// on the calling thread before returning.
    ///
    /// # Errors
    ///
    /// `PoolError::Closed` if the pool is closed on entry or is closed while
    /// this call waits for queue space. The task is never silently dropped.
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.shared.queue.state() == PoolState::Closed {
            self.shared.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::Closed);
        }

        let task_id = self.task_id_counter.fetch_add(1, Ordering::Relaxed);
        let (completer, handle) = task_channel(task_id);

        let shared = Arc::clone(&self.shared);
        let run: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(value) => Ok(value),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(task_id = task_id, panic = %message, "Task panicked");
                    Err(PoolError::TaskPanicked(message))
                }
            };
            shared.counters.record_outcome(outcome.is_ok());
            completer.complete(outcome);
        });

        if self.config.worker_count == 0 {
            self.shared.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
            debug!(task_id = task_id, "Running task inline");
            run();
            return Ok(handle);
        }

        match self.shared.queue.push(QueuedTask { id: task_id, run }) {
            Ok(()) => {
                self.shared.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = task_id, "Task submitted to worker pool");
                Ok(handle)
            }
            Err(QueueClosed(task)) => {
                drop(task);
                self.shared.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = task_id, "Task rejected, pool closed");
                Err(PoolError::Closed)
            }
        }
    }

    /// Stop dispatching tasks. Queued tasks are kept and submissions are
    /// still accepted up to capacity.
    ///
    /// # Errors
    ///
    /// `PoolError::Closed` if the pool has been shut down.
    pub fn pause(&self) -> Result<(), PoolError> {
        match self.shared.queue.pause() {
            PoolState::Closed => Err(PoolError::Closed),
            PoolState::Running => {
                info!("Worker pool paused");
                Ok(())
            }
            PoolState::Paused => Ok(()),
        }
    }

    /// Resume dispatching after [`pause`](Self::pause).
    ///
    /// # Errors
    ///
    /// `PoolError::Closed` if the pool has been shut down.
    pub fn resume(&self) -> Result<(), PoolError> {
        match self.shared.queue.resume() {
            PoolState::Closed => Err(PoolError::Closed),
            PoolState::Paused => {
                info!("Worker pool resumed");
                Ok(())
            }
            PoolState::Running => Ok(()),
        }
    }

    /// Close the pool and join every worker. Idempotent.
    ///
    /// With `drain`, tasks still queued run before the workers exit (even if
    /// the pool was paused). Without it they are discarded and their handles
    /// resolve with `PoolError::Closed`. Producers blocked on backpressure
    /// are released with `PoolError::Closed` either way.
    ///
    /// Called from one of this pool's own workers, the calling thread is not
    /// joined.
    pub fn shutdown(&self, drain: bool) {
        let Some(discarded) = self.shared.queue.close(drain) else {
            return;
        };

        let discarded_count = discarded.len();
        // Dropping the tasks resolves their handles with `Closed`.
        drop(discarded);
        self.shared
            .counters
            .discarded_tasks
            .fetch_add(discarded_count as u64, Ordering::Relaxed);

        info!(drain = drain, discarded = discarded_count, "Shutting down worker pool");

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        let worker_count = workers.len();
        let current = thread::current().id();

        for (idx, worker) in workers.into_iter().enumerate() {
            if worker.thread().id() == current {
                warn!(worker_id = idx, "shutdown called from a pool worker; not joining itself");
                continue;
            }
            match worker.join() {
                Ok(()) => debug!(worker_id = idx, "Worker joined"),
                Err(_) => warn!(worker_id = idx, "Worker thread panicked"),
            }
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
    }

    /// Change the queue capacity (0 = unbounded).
    pub fn set_queue_capacity(&self, capacity: usize) {
        self.shared.queue.set_capacity(capacity);
        debug!(capacity = capacity, "Worker pool queue capacity changed");
    }

    /// Number of tasks waiting in the queue.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Number of worker threads currently alive.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.shared.live_workers.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.shared.queue.state()
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared
            .counters
            .snapshot(self.thread_count(), self.task_count())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.state() != PoolState::Closed {
            debug!("WorkerPool dropped without explicit shutdown - draining");
        }
        self.shutdown(true);
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    worker_id: usize,
    config: &WorkerPoolConfig,
    shared: Arc<PoolShared>,
    started: Arc<Semaphore>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            shared.live_workers.fetch_add(1, Ordering::AcqRel);
            started.notify();
            debug!(worker_id = worker_id, "Worker thread started");

            // `pop` returns None once the queue is closed and empty.
            while let Some(task) = shared.queue.pop() {
                shared.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = worker_id, task_id = task.id, "Worker executing task");

                (task.run)();

                shared.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
            }

            shared.live_workers.fetch_sub(1, Ordering::AcqRel);
            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}
