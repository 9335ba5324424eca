//! Condition variable.
//!
//! Pairs with [`Mutex`](crate::Mutex): `wait*` atomically releases the guard's
//! lock, blocks, and re-acquires it before returning. Callers must re-check
//! their predicate after every wake; the `wait_while*` variants do that loop
//! for you.

use std::time::{Duration, Instant};

use crate::MutexGuard;

pub use parking_lot::WaitTimeoutResult;

/// A condition variable.
///
/// Unlike `std::sync::Condvar`, this type does not implement poisoning.
///
/// # Examples
///
/// ```
/// use threadkit::{Condvar, Mutex};
/// use std::sync::Arc;
/// use std::thread;
///
/// let pair = Arc::new((Mutex::new(false), Condvar::new()));
/// let pair2 = Arc::clone(&pair);
///
/// thread::spawn(move || {
///     let (lock, cvar) = &*pair2;
///     *lock.lock() = true;
///     cvar.notify_one();
/// });
///
/// let (lock, cvar) = &*pair;
/// let mut ready = lock.lock();
/// cvar.wait_while(&mut ready, |ready| !*ready);
/// assert!(*ready);
/// ```
#[derive(Debug, Default)]
pub struct Condvar {
    inner: parking_lot::Condvar,
}

impl Condvar {
    /// Creates a new condition variable.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::Condvar::new(),
        }
    }

    /// Blocks until notified. The lock held by `guard` is released while blocked.
    #[inline]
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.inner.wait(guard);
    }

    /// Blocks while `condition` returns `true`.
    #[inline]
    pub fn wait_while<T, F>(&self, guard: &mut MutexGuard<'_, T>, condition: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        self.inner.wait_while(guard, condition);
    }

    /// Blocks until notified or until `timeout` has elapsed.
    #[inline]
    pub fn wait_for<T>(&self, guard: &mut MutexGuard<'_, T>, timeout: Duration) -> WaitTimeoutResult {
        self.inner.wait_for(guard, timeout)
    }

    /// Blocks until notified or until the monotonic `deadline` is reached.
    #[inline]
    pub fn wait_until<T>(&self, guard: &mut MutexGuard<'_, T>, deadline: Instant) -> WaitTimeoutResult {
        self.inner.wait_until(guard, deadline)
    }

    /// Blocks while `condition` returns `true`, giving up after `timeout`.
    ///
    /// The result reports a timeout only if the condition still held when
    /// the time ran out.
    #[inline]
    pub fn wait_while_for<T, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        condition: F,
        timeout: Duration,
    ) -> WaitTimeoutResult
    where
        F: FnMut(&mut T) -> bool,
    {
        self.inner.wait_while_for(guard, condition, timeout)
    }

    /// Wakes up one blocked thread. Returns whether a thread was woken.
    ///
    /// Notifications are not buffered: with no waiter present this is a no-op.
    #[inline]
    pub fn notify_one(&self) -> bool {
        self.inner.notify_one()
    }

    /// Wakes up all blocked threads and returns how many were woken.
    #[inline]
    pub fn notify_all(&self) -> usize {
        self.inner.notify_all()
    }
}
