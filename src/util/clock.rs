//! Monotonic microsecond clock.
//!
//! Timestamps count microseconds since a process-local epoch taken from
//! [`Instant`], so wall-clock adjustments never move them.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Microseconds since the process-local monotonic epoch.
pub type Micros = u64;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Current monotonic time in microseconds.
#[must_use]
pub fn now_micros() -> Micros {
    duration_to_micros(epoch().elapsed())
}

/// Saturating conversion of a duration to whole microseconds.
#[must_use]
pub fn duration_to_micros(d: Duration) -> Micros {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// `now + interval`, saturating at the end of representable time.
#[must_use]
pub fn deadline_after(now: Micros, interval: Duration) -> Micros {
    now.saturating_add(duration_to_micros(interval))
}

/// Time left from `now` until `deadline`; zero once it has passed.
#[must_use]
pub const fn until(now: Micros, deadline: Micros) -> Duration {
    Duration::from_micros(deadline.saturating_sub(now))
}
