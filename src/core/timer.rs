//! One-shot and periodic timers driven by two background threads.
//!
//! The *scheduler* thread sleeps until the earliest deadline in the
//! [`TimerRegistry`] (or until a timer is started or stopped), moves every due
//! timer to a ready queue and re-arms periodic ones. The *dispatcher* thread
//! pops the ready queue and runs callbacks, so a slow callback delays other
//! callbacks but never the deadline bookkeeping.
//!
//! All deadlines are microseconds on a monotonic clock
//! ([`now_micros`](crate::util::clock::now_micros)). Periodic timers re-arm
//! relative to the moment they fired, not to their previous deadline.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use threadkit::core::TimerService;
//!
//! let service = TimerService::new()?;
//! let fired = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&fired);
//!
//! let timer = service.create_timer(
//!     Duration::from_millis(10),
//!     move || { counter.fetch_add(1, Ordering::SeqCst); },
//!     false,
//! )?;
//! service.start(&timer)?;
//! std::thread::sleep(Duration::from_millis(100));
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! # Ok::<(), threadkit::core::TimerError>(())
//! ```

mod registry;
mod service;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use registry::{ScheduledEntry, TimerRegistry};
pub use service::{Timer, TimerService};

/// Identity of a timer, unique for the lifetime of its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(u64);

impl TimerId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Created but never started.
    Created,
    /// Scheduled and due to fire.
    Armed,
    /// One-shot timer whose callback has been dispatched.
    Fired,
    /// Stopped, or its service shut down while it was armed.
    Cancelled,
}

/// Timer service statistics. Eventually consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStats {
    /// Timers created over the service lifetime.
    pub created: u64,
    /// Timers currently armed.
    pub active: usize,
    /// Callbacks dispatched.
    pub fired: u64,
    /// Callbacks that panicked.
    pub panicked: u64,
}
