//! Result handles for submitted tasks.
//!
//! A task and its handle share one slot: a [`Mutex`] holding the outcome and a
//! [`Condvar`] signalled when it lands. The task side owns a [`Completer`];
//! if the completer is dropped without completing (the task was discarded by
//! shutdown) the slot resolves with [`PoolError::Closed`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::PoolError;
use crate::{Condvar, Mutex};

enum SlotState<T> {
    Pending,
    Ready(Result<T, PoolError>),
    Taken,
}

struct ResultSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> ResultSlot<T> {
    fn fill(&self, outcome: Result<T, PoolError>) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Ready(outcome);
            self.ready.notify_all();
        }
    }
}

fn take<T>(state: &mut SlotState<T>) -> Result<T, PoolError> {
    match std::mem::replace(state, SlotState::Taken) {
        SlotState::Ready(outcome) => outcome,
        SlotState::Taken => Err(PoolError::ResultTaken),
        SlotState::Pending => {
            *state = SlotState::Pending;
            Err(PoolError::Timeout)
        }
    }
}

/// Create a connected completer/handle pair for task `task_id`.
pub(crate) fn task_channel<T>(task_id: u64) -> (Completer<T>, TaskHandle<T>) {
    let slot = Arc::new(ResultSlot {
        state: Mutex::new(SlotState::Pending),
        ready: Condvar::new(),
    });
    (
        Completer {
            slot: Some(Arc::clone(&slot)),
        },
        TaskHandle { task_id, slot },
    )
}

/// Producer side of a task result.
pub(crate) struct Completer<T> {
    slot: Option<Arc<ResultSlot<T>>>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(mut self, outcome: Result<T, PoolError>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(outcome);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(PoolError::Closed));
        }
    }
}

/// Handle to the eventual result of a submitted task.
pub struct TaskHandle<T> {
    task_id: u64,
    slot: Arc<ResultSlot<T>>,
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task_id", &self.task_id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<T> TaskHandle<T> {
    /// Pool-assigned task id, increasing in submission order.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.task_id
    }

    /// Whether the task has produced an outcome (or was discarded).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(*self.slot.state.lock(), SlotState::Pending)
    }

    /// Block until the task finishes and return its outcome.
    ///
    /// # Errors
    ///
    /// - [`PoolError::TaskPanicked`] if the task panicked
    /// - [`PoolError::Closed`] if the pool discarded the task
    /// - [`PoolError::ResultTaken`] if the result was already taken
    pub fn wait(self) -> Result<T, PoolError> {
        let mut state = self.slot.state.lock();
        self.slot
            .ready
            .wait_while(&mut state, |s| matches!(s, SlotState::Pending));
        take(&mut state)
    }

    /// Block for at most `timeout` waiting for the outcome.
    ///
    /// The handle stays usable after a timeout; once an outcome has been
    /// returned, later calls yield [`PoolError::ResultTaken`].
    ///
    /// # Errors
    ///
    /// [`PoolError::Timeout`] if the task is still running, otherwise as for
    /// [`wait`](Self::wait).
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, PoolError> {
        let mut state = self.slot.state.lock();
        let _ = self.slot.ready.wait_while_for(
            &mut state,
            |s| matches!(s, SlotState::Pending),
            timeout,
        );
        take(&mut state)
    }

    /// Take the outcome if it is available, without blocking.
    pub fn try_take(&self) -> Option<Result<T, PoolError>> {
        let mut state = self.slot.state.lock();
        if matches!(*state, SlotState::Ready(_)) {
            Some(take(&mut state))
        } else {
            None
        }
    }
}

#[cfg(feature = "tokio-runtime")]
impl<T: Send + 'static> TaskHandle<T> {
    /// Await the outcome from async code. The blocking wait runs on tokio's
    /// blocking thread pool.
    ///
    /// # Errors
    ///
    /// As for [`wait`](Self::wait); [`PoolError::Closed`] if the tokio
    /// runtime cancels the blocking wait.
    pub async fn wait_async(self) -> Result<T, PoolError> {
        tokio::task::spawn_blocking(move || self.wait())
            .await
            .map_err(|_| PoolError::Closed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_complete_then_wait() {
        let (completer, handle) = task_channel::<u32>(3);
        assert_eq!(handle.id(), 3);
        assert!(!handle.is_finished());

        completer.complete(Ok(9));
        assert!(handle.is_finished());
        assert_eq!(handle.wait().unwrap(), 9);
    }

    #[test]
    fn test_dropped_completer_resolves_closed() {
        let (completer, handle) = task_channel::<()>(0);
        drop(completer);
        assert!(matches!(handle.wait(), Err(PoolError::Closed)));
    }

    #[test]
    fn test_wait_timeout_then_take() {
        let (completer, handle) = task_channel::<&str>(1);
        assert!(matches!(
            handle.wait_timeout(Duration::from_millis(5)),
            Err(PoolError::Timeout)
        ));

        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.complete(Ok("done"));
        });

        assert_eq!(handle.wait_timeout(Duration::from_secs(5)).unwrap(), "done");
        assert!(matches!(handle.try_take(), None));
        assert!(matches!(
            handle.wait_timeout(Duration::from_millis(1)),
            Err(PoolError::ResultTaken)
        ));
        waker.join().unwrap();
    }

    #[test]
    fn test_try_take_pending() {
        let (_completer, handle) = task_channel::<u8>(2);
        assert!(handle.try_take().is_none());
    }
}
