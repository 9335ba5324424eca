//! Timer service: timer table, scheduler loop and dispatcher loop.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{TimerId, TimerRegistry, TimerState, TimerStats};
use crate::config::TimerServiceConfig;
use crate::core::error::panic_message;
use crate::core::task_queue::BoundedQueue;
use crate::core::TimerError;
use crate::util::clock::{self, Micros};
use crate::{Condvar, Mutex, MutexGuard};

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Everything the service knows about one timer.
struct TimerSlot {
    interval: Duration,
    callback: Callback,
    periodic: bool,
    state: TimerState,
    next_fire: Option<Micros>,
    /// Bumped by every start/stop; fires carrying an older value are stale.
    generation: u64,
    /// A fire for the current generation sits in the ready queue.
    fire_pending: bool,
    /// The user's `Timer` handle still exists.
    handle_alive: bool,
}

/// Timer arena plus the deadline index, guarded by one lock.
struct TimerTable {
    slots: HashMap<TimerId, TimerSlot>,
    registry: TimerRegistry,
    closed: bool,
}

/// A due timer handed from the scheduler to the dispatcher.
#[derive(Debug, Clone, Copy)]
struct Fire {
    id: TimerId,
    generation: u64,
}

#[derive(Debug, Default)]
struct TimerCounters {
    created: AtomicU64,
    fired: AtomicU64,
    panicked: AtomicU64,
}

struct TimerShared {
    table: Mutex<TimerTable>,
    /// Signalled whenever the earliest deadline may have moved, and on close.
    schedule_changed: Condvar,
    ready: BoundedQueue<Fire>,
    next_id: AtomicU64,
    counters: TimerCounters,
}

impl TimerShared {
    fn start(&self, id: TimerId) -> Result<(), TimerError> {
        let mut guard = self.table.lock();
        let table = &mut *guard;
        if table.closed {
            return Err(TimerError::Closed);
        }
        let slot = table.slots.get_mut(&id).ok_or(TimerError::Closed)?;

        let next_fire = clock::deadline_after(clock::now_micros(), slot.interval);
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = TimerState::Armed;
        slot.next_fire = Some(next_fire);
        slot.fire_pending = false;
        table.registry.insert(id, next_fire);
        self.schedule_changed.notify_one();

        debug!(timer_id = %id, next_fire = next_fire, periodic = slot.periodic, "Timer armed");
        Ok(())
    }

    /// Disarm `id`. Returns whether it was armed.
    fn stop(&self, id: TimerId) -> bool {
        let mut guard = self.table.lock();
        let table = &mut *guard;
        let Some(slot) = table.slots.get_mut(&id) else {
            return false;
        };

        let was_armed = slot.state == TimerState::Armed;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_fire = None;
        slot.fire_pending = false;
        if was_armed {
            slot.state = TimerState::Cancelled;
        }
        let handle_alive = slot.handle_alive;

        table.registry.remove(id);
        let removed = if handle_alive {
            None
        } else {
            table.slots.remove(&id)
        };
        self.schedule_changed.notify_one();
        drop(guard);
        // The callback may own other timers; drop it with the table unlocked.
        drop(removed);

        if was_armed {
            debug!(timer_id = %id, "Timer stopped");
        }
        was_armed
    }

    /// The user's handle went away: free the slot unless the timer is still armed.
    fn release(&self, id: TimerId) {
        let mut table = self.table.lock();
        let armed = match table.slots.get_mut(&id) {
            Some(slot) if slot.state == TimerState::Armed => {
                slot.handle_alive = false;
                true
            }
            Some(_) => false,
            None => return,
        };
        if !armed {
            let removed = table.slots.remove(&id);
            drop(table);
            drop(removed);
        }
    }

    fn state_of(&self, id: TimerId) -> TimerState {
        self.table
            .lock()
            .slots
            .get(&id)
            .map_or(TimerState::Cancelled, |slot| slot.state)
    }
}

/// Owner of the scheduler and dispatcher threads.
///
/// Dropping the service shuts it down. Timers created by a service that has
/// been dropped report [`TimerState::Cancelled`] and refuse to start.
pub struct TimerService {
    config: TimerServiceConfig,
    shared: Arc<TimerShared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for TimerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerService")
            .field("thread_name_prefix", &self.config.thread_name_prefix)
            .field("active_timers", &self.active_timer_count())
            .finish_non_exhaustive()
    }
}

impl TimerService {
    /// Start a timer service with default configuration.
    ///
    /// # Errors
    ///
    /// `TimerError::Spawn` if either background thread cannot be created.
    pub fn new() -> Result<Self, TimerError> {
        Self::with_config(TimerServiceConfig::default())
    }

    /// Start a timer service: spawns the scheduler and dispatcher threads.
    ///
    /// # Errors
    ///
    /// - `TimerError::InvalidConfig` if the configuration is invalid
    /// - `TimerError::Spawn` if either thread cannot be created; nothing is
    ///   left running in that case
    pub fn with_config(config: TimerServiceConfig) -> Result<Self, TimerError> {
        config
            .validate()
            .map_err(|e| TimerError::InvalidConfig(e.to_string()))?;

        let shared = Arc::new(TimerShared {
            table: Mutex::new(TimerTable {
                slots: HashMap::new(),
                registry: TimerRegistry::new(),
                closed: false,
            }),
            schedule_changed: Condvar::new(),
            ready: BoundedQueue::unbounded(),
            next_id: AtomicU64::new(0),
            counters: TimerCounters::default(),
        });

        let scheduler = spawn_loop(&config, "scheduler", Arc::clone(&shared), run_scheduler)
            .map_err(TimerError::Spawn)?;
        let dispatcher = match spawn_loop(&config, "dispatcher", Arc::clone(&shared), run_dispatcher) {
            Ok(handle) => handle,
            Err(e) => {
                close_shared(&shared);
                let _ = scheduler.join();
                return Err(TimerError::Spawn(e));
            }
        };

        info!(prefix = %config.thread_name_prefix, "TimerService started");

        Ok(Self {
            config,
            shared,
            threads: Mutex::new(vec![scheduler, dispatcher]),
        })
    }

    /// Create an inert timer. Nothing is scheduled until it is started.
    ///
    /// The callback runs on the dispatcher thread, once per fire.
    ///
    /// # Errors
    ///
    /// - `TimerError::ZeroInterval` for a periodic timer with a zero interval
    /// - `TimerError::Closed` if the service has been shut down
    pub fn create_timer<F>(
        &self,
        interval: Duration,
        callback: F,
        periodic: bool,
    ) -> Result<Timer, TimerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if periodic && interval.is_zero() {
            return Err(TimerError::ZeroInterval);
        }

        let mut table = self.shared.table.lock();
        if table.closed {
            return Err(TimerError::Closed);
        }
        let id = TimerId::from_raw(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        table.slots.insert(
            id,
            TimerSlot {
                interval,
                callback: Arc::new(callback),
                periodic,
                state: TimerState::Created,
                next_fire: None,
                generation: 0,
                fire_pending: false,
                handle_alive: true,
            },
        );
        drop(table);

        self.shared.counters.created.fetch_add(1, Ordering::Relaxed);
        debug!(
            timer_id = %id,
            interval_us = clock::duration_to_micros(interval),
            periodic = periodic,
            "Timer created"
        );

        Ok(Timer {
            id,
            interval,
            periodic,
            service: Arc::downgrade(&self.shared),
        })
    }

    /// Shorthand for a one-shot [`create_timer`](Self::create_timer).
    ///
    /// # Errors
    ///
    /// As for `create_timer`.
    pub fn create_one_shot<F>(&self, interval: Duration, callback: F) -> Result<Timer, TimerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.create_timer(interval, callback, false)
    }

    /// Shorthand for a periodic [`create_timer`](Self::create_timer).
    ///
    /// # Errors
    ///
    /// As for `create_timer`.
    pub fn create_periodic<F>(&self, interval: Duration, callback: F) -> Result<Timer, TimerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.create_timer(interval, callback, true)
    }

    /// Arm `timer` to fire one interval from now.
    ///
    /// Starting an armed timer restarts it: the old deadline is dropped and a
    /// fire already queued for the old schedule is skipped.
    ///
    /// # Errors
    ///
    /// - `TimerError::Closed` if the service has been shut down
    /// - `TimerError::ForeignTimer` if `timer` came from another service
    pub fn start(&self, timer: &Timer) -> Result<(), TimerError> {
        self.check_owner(timer)?;
        self.shared.start(timer.id)
    }

    /// Disarm `timer`. Safe on timers that already fired, were never
    /// started, or were stopped before.
    pub fn stop(&self, timer: &Timer) {
        if self.check_owner(timer).is_ok() {
            self.shared.stop(timer.id);
        }
    }

    /// Disarm the timer with `id`. Returns whether it was armed.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.shared.stop(id)
    }

    /// Number of armed timers.
    #[must_use]
    pub fn active_timer_count(&self) -> usize {
        self.shared.table.lock().registry.len()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> TimerStats {
        let counters = &self.shared.counters;
        TimerStats {
            created: counters.created.load(Ordering::Relaxed),
            active: self.active_timer_count(),
            fired: counters.fired.load(Ordering::Relaxed),
            panicked: counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Stop both loops and join their threads. Idempotent.
    ///
    /// Armed timers become [`TimerState::Cancelled`]; fires waiting for the
    /// dispatcher are dropped. A callback may call this; its own thread is
    /// then left to exit on its own.
    pub fn shutdown(&self) {
        if !close_shared(&self.shared) {
            return;
        }
        info!("Shutting down timer service");

        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in threads {
            if handle.thread().id() == current {
                warn!("shutdown called from a timer callback; not joining the dispatcher");
                continue;
            }
            if handle.join().is_err() {
                warn!("Timer thread panicked");
            }
        }

        info!("Timer service shut down complete");
    }

    fn check_owner(&self, timer: &Timer) -> Result<(), TimerError> {
        if std::ptr::eq(timer.service.as_ptr(), Arc::as_ptr(&self.shared)) {
            Ok(())
        } else {
            Err(TimerError::ForeignTimer(timer.id.as_u64()))
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Mark the table closed and wake both loops. Returns `false` if it was
/// already closed.
fn close_shared(shared: &TimerShared) -> bool {
    {
        let mut table = shared.table.lock();
        if table.closed {
            return false;
        }
        table.closed = true;
        table.registry.clear();
        for slot in table.slots.values_mut() {
            if slot.state == TimerState::Armed {
                slot.state = TimerState::Cancelled;
                slot.next_fire = None;
            }
        }
        shared.schedule_changed.notify_all();
    }
    shared.ready.close(false);
    true
}

fn spawn_loop(
    config: &TimerServiceConfig,
    role: &str,
    shared: Arc<TimerShared>,
    body: fn(&TimerShared),
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{role}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || body(&shared))
}

/// Moves due timers to the ready queue and re-arms periodic ones.
fn run_scheduler(shared: &TimerShared) {
    debug!("Timer scheduler started");
    let mut table = shared.table.lock();

    while !table.closed {
        let now = clock::now_micros();
        let due = collect_due(&mut table, now);

        if !due.is_empty() {
            MutexGuard::unlocked(&mut table, || {
                for fire in due {
                    if shared.ready.push(fire).is_err() {
                        break;
                    }
                }
            });
            // Deadlines may have moved while unlocked.
            continue;
        }

        match table.registry.next_deadline() {
            None => shared.schedule_changed.wait(&mut table),
            Some(deadline) => {
                let wait = clock::until(clock::now_micros(), deadline);
                let _ = shared.schedule_changed.wait_for(&mut table, wait);
            }
        }
    }

    debug!("Timer scheduler exiting");
}

/// Pop every entry due at `now`. Periodic timers are re-armed at
/// `now + interval` before their fire is handed out, and a timer with a fire
/// still waiting for the dispatcher is not queued twice.
fn collect_due(table: &mut TimerTable, now: Micros) -> Vec<Fire> {
    let mut due = Vec::new();
    while let Some(entry) = table.registry.pop_if_ready(now) {
        let Some(slot) = table.slots.get_mut(&entry.id) else {
            continue;
        };
        if slot.state != TimerState::Armed {
            continue;
        }

        if slot.periodic {
            let next_fire = clock::deadline_after(now, slot.interval);
            slot.next_fire = Some(next_fire);
            table.registry.insert(entry.id, next_fire);
        } else {
            slot.next_fire = None;
        }

        if slot.fire_pending {
            debug!(timer_id = %entry.id, "Previous fire still pending; coalescing");
            continue;
        }
        slot.fire_pending = true;
        due.push(Fire {
            id: entry.id,
            generation: slot.generation,
        });
    }
    due
}

/// Runs callbacks for fires whose timer is still armed under the same
/// generation.
fn run_dispatcher(shared: &TimerShared) {
    debug!("Timer dispatcher started");

    while let Some(fire) = shared.ready.pop() {
        let Some(callback) = claim_fire(shared, fire) else {
            continue;
        };

        shared.counters.fired.fetch_add(1, Ordering::Relaxed);
        debug!(timer_id = %fire.id, "Dispatching timer callback");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            shared.counters.panicked.fetch_add(1, Ordering::Relaxed);
            error!(
                timer_id = %fire.id,
                panic = %panic_message(payload.as_ref()),
                "Timer callback panicked"
            );
        }
    }

    debug!("Timer dispatcher exiting");
}

fn claim_fire(shared: &TimerShared, fire: Fire) -> Option<Callback> {
    let mut guard = shared.table.lock();
    let table = &mut *guard;
    let slot = table.slots.get_mut(&fire.id)?;
    if slot.generation != fire.generation || slot.state != TimerState::Armed {
        return None;
    }

    slot.fire_pending = false;
    let callback = Arc::clone(&slot.callback);
    if !slot.periodic {
        slot.state = TimerState::Fired;
        if !slot.handle_alive {
            table.slots.remove(&fire.id);
        }
    }
    Some(callback)
}

/// User handle to a timer owned by a [`TimerService`].
///
/// The handle holds only a weak reference to its service. Dropping it does
/// not cancel an armed timer; call [`stop`](Self::stop) for that.
pub struct Timer {
    id: TimerId,
    interval: Duration,
    periodic: bool,
    service: Weak<TimerShared>,
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .field("periodic", &self.periodic)
            .finish_non_exhaustive()
    }
}

impl Timer {
    /// Timer identity.
    #[must_use]
    pub const fn id(&self) -> TimerId {
        self.id
    }

    /// Configured interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the timer re-arms after each fire.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        self.service
            .upgrade()
            .map_or(TimerState::Cancelled, |shared| shared.state_of(self.id))
    }

    /// Whether the timer is scheduled to fire.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state() == TimerState::Armed
    }

    /// Arm (or restart) the timer through its service.
    ///
    /// # Errors
    ///
    /// `TimerError::Closed` if the service is shut down or gone.
    pub fn start(&self) -> Result<(), TimerError> {
        let shared = self.service.upgrade().ok_or(TimerError::Closed)?;
        shared.start(self.id)
    }

    /// Disarm the timer. No-op if it is not armed or the service is gone.
    pub fn stop(&self) {
        if let Some(shared) = self.service.upgrade() {
            shared.stop(self.id);
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(shared) = self.service.upgrade() {
            shared.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_created_timer_is_inert() {
        let service = TimerService::new().unwrap();
        let (count, cb) = counting_callback();
        let timer = service.create_timer(Duration::from_millis(1), cb, false).unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(timer.state(), TimerState::Created);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(service.active_timer_count(), 0);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let service = TimerService::new().unwrap();
        let a = service.create_one_shot(Duration::from_secs(1), || {}).unwrap();
        let b = service.create_one_shot(Duration::from_secs(1), || {}).unwrap();
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_zero_interval_periodic_rejected() {
        let service = TimerService::new().unwrap();
        assert!(matches!(
            service.create_periodic(Duration::ZERO, || {}),
            Err(TimerError::ZeroInterval)
        ));
    }

    #[test]
    fn test_stop_before_fire_prevents_callback() {
        let service = TimerService::new().unwrap();
        let (count, cb) = counting_callback();
        let timer = service.create_one_shot(Duration::from_millis(30), cb).unwrap();

        service.start(&timer).unwrap();
        assert!(timer.is_armed());
        service.stop(&timer);

        thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[test]
    fn test_restart_replaces_schedule() {
        let service = TimerService::new().unwrap();
        let (count, cb) = counting_callback();
        let timer = service.create_one_shot(Duration::from_millis(40), cb).unwrap();

        service.start(&timer).unwrap();
        thread::sleep(Duration::from_millis(20));
        service.start(&timer).unwrap();
        assert_eq!(service.active_timer_count(), 1);

        thread::sleep(Duration::from_millis(120));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Fired);
    }

    #[test]
    fn test_foreign_timer_rejected() {
        let a = TimerService::new().unwrap();
        let b = TimerService::new().unwrap();
        let timer = a.create_one_shot(Duration::from_secs(1), || {}).unwrap();

        assert!(matches!(b.start(&timer), Err(TimerError::ForeignTimer(_))));
        b.stop(&timer);
        assert_eq!(timer.state(), TimerState::Created);
    }

    #[test]
    fn test_dropped_handle_frees_slot_after_fire() {
        let service = TimerService::new().unwrap();
        let (count, cb) = counting_callback();
        let timer = service.create_one_shot(Duration::from_millis(10), cb).unwrap();
        service.start(&timer).unwrap();
        drop(timer);

        thread::sleep(Duration::from_millis(80));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(service.shared.table.lock().slots.is_empty());
    }

    #[test]
    fn test_shutdown_cancels_and_rejects() {
        let service = TimerService::new().unwrap();
        let timer = service.create_one_shot(Duration::from_secs(10), || {}).unwrap();
        service.start(&timer).unwrap();

        service.shutdown();
        service.shutdown();

        assert_eq!(timer.state(), TimerState::Cancelled);
        assert_eq!(service.active_timer_count(), 0);
        assert!(matches!(service.start(&timer), Err(TimerError::Closed)));
        assert!(matches!(
            service.create_one_shot(Duration::from_secs(1), || {}),
            Err(TimerError::Closed)
        ));
    }

    #[test]
    fn test_handle_outlives_service() {
        let service = TimerService::new().unwrap();
        let timer = service.create_one_shot(Duration::from_secs(1), || {}).unwrap();
        drop(service);

        assert_eq!(timer.state(), TimerState::Cancelled);
        assert!(matches!(timer.start(), Err(TimerError::Closed)));
        timer.stop();
    }

    /// Runs `body` on a helper thread and fails if it does not finish.
    fn finishes_within(timeout: Duration, body: impl FnOnce() + Send + 'static) -> bool {
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            body();
            let _ = tx.send(());
        });
        rx.recv_timeout(timeout).is_ok()
    }

    #[test]
    fn test_dropping_timer_whose_callback_owns_a_timer() {
        let service = Arc::new(TimerService::new().unwrap());
        let inner = service.create_one_shot(Duration::from_secs(1), || {}).unwrap();
        let outer = service
            .create_one_shot(Duration::from_secs(1), move || {
                let _ = inner.id();
            })
            .unwrap();

        assert!(finishes_within(Duration::from_secs(2), move || drop(outer)));
        assert!(service.shared.table.lock().slots.is_empty());
    }

    #[test]
    fn test_cancel_frees_slot_whose_callback_owns_a_timer() {
        let service = Arc::new(TimerService::new().unwrap());
        let inner = service.create_one_shot(Duration::from_secs(1), || {}).unwrap();
        let outer = service
            .create_one_shot(Duration::from_secs(10), move || {
                let _ = inner.id();
            })
            .unwrap();
        service.start(&outer).unwrap();
        let id = outer.id();
        drop(outer);

        let svc = Arc::clone(&service);
        assert!(finishes_within(Duration::from_secs(2), move || {
            assert!(svc.cancel(id));
        }));
        assert!(service.shared.table.lock().slots.is_empty());
        assert_eq!(service.active_timer_count(), 0);
    }

}
