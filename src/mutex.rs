//! Exclusive locks.
//!
//! [`Mutex`] is `parking_lot`'s mutex: non-reentrant, no poisoning, and the
//! returned [`MutexGuard`] releases the lock on every exit path of its scope,
//! including unwinding. A thread that locks the same mutex twice deadlocks.
//!
//! [`Spinlock`] is a busy-waiting lock for critical sections that are only a
//! handful of instructions long. It never parks the thread; contended waiters
//! spin with exponential backoff and fall back to yielding the CPU.
//!
//! # Examples
//!
//! ```
//! use threadkit::{Mutex, Spinlock};
//!
//! let counter = Mutex::new(0);
//! *counter.lock() += 1;
//! assert_eq!(*counter.lock(), 1);
//!
//! let flag = Spinlock::new(false);
//! *flag.lock() = true;
//! assert!(*flag.lock());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot_core::SpinWait;

pub use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

/// Raw busy-wait lock backing [`Spinlock`].
#[derive(Debug)]
pub struct RawSpinlock {
    locked: AtomicBool,
}

// SAFETY: `lock`/`try_lock` only succeed after swapping `locked` from false to
// true with Acquire ordering, so at most one holder exists at a time, and
// `unlock` publishes the holder's writes with Release ordering.
#[allow(unsafe_code)]
unsafe impl lock_api::RawMutex for RawSpinlock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        let mut spin = SpinWait::new();
        while !self.try_lock() {
            // Wait on a plain load so contended waiters don't bounce the cache line.
            while self.locked.load(Ordering::Relaxed) {
                if !spin.spin() {
                    std::thread::yield_now();
                }
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Busy-waiting mutual exclusion lock.
pub type Spinlock<T> = lock_api::Mutex<RawSpinlock, T>;

/// Scoped guard for [`Spinlock`]; unlocks on drop.
pub type SpinlockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinlock, T>;
