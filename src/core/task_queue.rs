//! Bounded blocking FIFO shared by producers and worker threads.
//!
//! One [`Mutex`] guards the items, the capacity and the lifecycle state, so a
//! producer's "is it full / is it closed" check and its insertion happen under
//! the same lock as the consumer's removal. Two condition variables carry the
//! wake-ups: `not_empty` for consumers, `not_full` for producers blocked on
//! backpressure. Closing broadcasts on both.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Condvar, Mutex};

/// Lifecycle of a queue and of the pool that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Items are handed to consumers.
    Running,
    /// Consumers park; producers may still fill the queue up to capacity.
    Paused,
    /// Terminal. Pushes are rejected and idle consumers are released.
    Closed,
}

/// Returned by [`BoundedQueue::push`] when the queue is closed. Carries the
/// rejected item back to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct QueueClosed<T>(pub T);

impl<T> fmt::Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> fmt::Display for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue closed")
    }
}

impl<T> std::error::Error for QueueClosed<T> {}

struct QueueInner<T> {
    items: VecDeque<T>,
    /// Zero means unbounded.
    capacity: usize,
    state: PoolState,
}

impl<T> QueueInner<T> {
    fn is_full(&self) -> bool {
        self.capacity > 0 && self.items.len() >= self.capacity
    }
}

/// FIFO with optional capacity bound and blocking push/pop.
pub struct BoundedQueue<T> {
    inner: Mutex<QueueInner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &inner.items.len())
            .field("capacity", &inner.capacity)
            .field("state", &inner.state)
            .finish()
    }
}

impl<T> BoundedQueue<T> {
    /// Create a running queue holding at most `capacity` items (0 = unbounded).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
                state: PoolState::Running,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Create a running queue without a capacity bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Append `item` at the tail.
    ///
    /// Blocks while the queue is at capacity. Paused queues still accept
    /// items up to capacity.
    ///
    /// # Errors
    ///
    /// Returns the item inside [`QueueClosed`] if the queue is closed on entry
    /// or gets closed while this call is blocked.
    pub fn push(&self, item: T) -> Result<(), QueueClosed<T>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.state == PoolState::Closed {
                return Err(QueueClosed(item));
            }
            if !inner.is_full() {
                break;
            }
            self.not_full.wait(&mut inner);
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head item.
    ///
    /// Blocks while the queue is empty or paused. Once closed, hands out
    /// whatever is left and then returns `None`.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            match inner.state {
                PoolState::Running => {
                    if let Some(item) = inner.items.pop_front() {
                        if inner.capacity > 0 {
                            self.not_full.notify_one();
                        }
                        return Some(item);
                    }
                }
                PoolState::Paused => {}
                PoolState::Closed => return inner.items.pop_front(),
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Close the queue. Idempotent.
    ///
    /// With `drain` the remaining items stay available to [`pop`](Self::pop);
    /// without it they are removed and returned so the caller can drop them
    /// outside the lock. Returns `None` if the queue was already closed.
    pub fn close(&self, drain: bool) -> Option<Vec<T>> {
        let discarded = {
            let mut inner = self.inner.lock();
            if inner.state == PoolState::Closed {
                return None;
            }
            inner.state = PoolState::Closed;
            let discarded: Vec<T> = if drain {
                Vec::new()
            } else {
                inner.items.drain(..).collect()
            };
            self.not_empty.notify_all();
            self.not_full.notify_all();
            discarded
        };
        Some(discarded)
    }

    /// Stop handing items to consumers. Returns the previous state; a closed
    /// queue stays closed.
    pub fn pause(&self) -> PoolState {
        let mut inner = self.inner.lock();
        let previous = inner.state;
        if previous == PoolState::Running {
            inner.state = PoolState::Paused;
        }
        previous
    }

    /// Resume handing items to consumers. Returns the previous state; a
    /// closed queue stays closed.
    pub fn resume(&self) -> PoolState {
        let mut inner = self.inner.lock();
        let previous = inner.state;
        if previous == PoolState::Paused {
            inner.state = PoolState::Running;
            self.not_empty.notify_all();
        }
        previous
    }

    /// Change the capacity bound (0 = unbounded). Raising it wakes producers
    /// blocked on the old bound.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        let grew = capacity == 0 || (inner.capacity != 0 && capacity > inner.capacity);
        inner.capacity = capacity;
        if grew {
            self.not_full.notify_all();
        }
    }

    /// Current capacity bound (0 = unbounded).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }
}
