//! # threadkit
//!
//! Thread-level concurrency building blocks: a bounded worker pool, a timer
//! service, and scoped synchronization primitives.
//!
//! ## Worker pool
//!
//! [`WorkerPool`](core::WorkerPool) runs closures on a fixed set of named OS
//! threads pulling from one FIFO queue. A bounded queue makes producers block
//! while it is full. Each submission returns a
//! [`TaskHandle`](core::TaskHandle) that yields the closure's return value, or
//! the panic that ended it.
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
//!
//! ## Timers
//!
//! [`TimerService`](core::TimerService) owns a scheduler thread that tracks
//! deadlines and a dispatcher thread that runs callbacks. Timers are created
//! inert, armed with `start`, and disarmed with `stop`; periodic timers
//! re-arm after every fire.
//!
//! ## Synchronization primitives
//!
//! - [`Mutex`] / [`Spinlock`] with scoped guards
//! - [`RwLock`] with shared read and exclusive write guards
//! - [`Semaphore`] with a scoped [`SemaphoreGuard`]
//! - [`Condvar`] that waits on a [`MutexGuard`]
//!
//! ## Configuration and logging
//!
//! [`config::RuntimeConfig`] loads from JSON or `THREADKIT_*` environment
//! variables; [`builders::build_context`] turns it into a running
//! [`runtime::Context`]. All components log through `tracing`; call
//! [`util::init_tracing`] to install a default subscriber.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders that turn configuration into running components.
pub mod builders;
/// Condition variables.
pub mod condvar;
/// Configuration models for the worker pool and the timer service.
pub mod config;
/// Worker pool, task queue and timer service.
pub mod core;
/// Mutual exclusion locks.
pub mod mutex;
/// Bundled runtime context.
pub mod runtime;
/// Reader-writer locks.
pub mod rwlock;
/// Counting semaphore.
pub mod semaphore;
/// Shared utilities.
pub mod util;

pub use condvar::{Condvar, WaitTimeoutResult};
pub use mutex::{MappedMutexGuard, Mutex, MutexGuard, RawSpinlock, Spinlock, SpinlockGuard};
pub use rwlock::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard,
    RwLockUpgradableReadGuard, RwLockWriteGuard,
};
pub use semaphore::{Semaphore, SemaphoreGuard};
