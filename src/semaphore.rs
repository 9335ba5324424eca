//! Counting semaphore.
//!
//! A permit counter guarded by a [`Mutex`] and a [`Condvar`]. `wait` blocks
//! until a permit is available and takes it; `notify` returns one and wakes a
//! single waiter. [`Semaphore::acquire`] gives the scoped form: the permit is
//! returned when the guard drops.
//!
//! ```
//! use threadkit::Semaphore;
//!
//! let sem = Semaphore::new(1);
//! {
//!     let _permit = sem.acquire();
//!     assert!(!sem.try_wait());
//! }
//! assert_eq!(sem.available(), 1);
//! ```

use std::time::Duration;

use crate::{Condvar, Mutex};

/// A counting semaphore.
#[derive(Debug, Default)]
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `permits` permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is available, then take it.
    pub fn wait(&self) {
        let mut permits = self.permits.lock();
        self.available.wait_while(&mut permits, |p| *p == 0);
        *permits -= 1;
    }

    /// Take a permit if one is available right now.
    pub fn try_wait(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Block for at most `timeout` waiting for a permit.
    ///
    /// Returns `true` if a permit was taken.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut permits = self.permits.lock();
        let _ = self
            .available
            .wait_while_for(&mut permits, |permits| *permits == 0, timeout);
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Return one permit and wake one waiter.
    pub fn notify(&self) {
        self.notify_n(1);
    }

    /// Return `n` permits and wake up to `n` waiters.
    pub fn notify_n(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut permits = self.permits.lock();
        *permits = permits.saturating_add(n);
        if n == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }

    /// Number of permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    /// Take a permit and return a guard that gives it back on drop.
    #[must_use = "the permit is returned as soon as the guard is dropped"]
    pub fn acquire(&self) -> SemaphoreGuard<'_> {
        self.wait();
        SemaphoreGuard { semaphore: self }
    }
}

/// Scoped permit from [`Semaphore::acquire`].
#[derive(Debug)]
pub struct SemaphoreGuard<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.semaphore.notify();
    }
}
