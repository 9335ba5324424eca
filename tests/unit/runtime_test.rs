//! Tests for the runtime context

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::bounded;
use threadkit::builders::build_context;
use threadkit::config::RuntimeConfig;
use threadkit::core::{PoolError, PoolState, TimerError};

fn small_config() -> RuntimeConfig {
    let mut cfg = RuntimeConfig::default();
    cfg.pool.worker_count = 2;
    cfg
}

#[test]
fn test_timer_callback_submits_to_pool() {
    let ctx = build_context(&small_config()).unwrap();
    let pool = ctx.pool_handle();
    let (tx, rx) = bounded(1);

    let timer = ctx
        .timers()
        .create_one_shot(Duration::from_millis(10), move || {
            let tx = tx.clone();
            let _ = pool.submit(move || tx.send(thread_name()).unwrap());
        })
        .unwrap();
    timer.start().unwrap();

    let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(name.starts_with("pool-worker-"), "ran on {name}");
    ctx.shutdown(true);
}

#[test]
fn test_clones_share_components() {
    let ctx = build_context(&small_config()).unwrap();
    let clone = ctx.clone();
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    clone
        .pool()
        .submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.pool().stats().completed_tasks, 1);
}

#[test]
fn test_shutdown_closes_both_components() {
    let ctx = build_context(&small_config()).unwrap();
    let timer = ctx
        .timers()
        .create_periodic(Duration::from_millis(10), || {})
        .unwrap();
    timer.start().unwrap();

    ctx.shutdown(false);

    assert_eq!(ctx.pool().state(), PoolState::Closed);
    assert!(matches!(ctx.pool().submit(|| ()), Err(PoolError::Closed)));
    assert!(matches!(timer.start(), Err(TimerError::Closed)));
    assert_eq!(ctx.timers().active_timer_count(), 0);
}

fn thread_name() -> String {
    std::thread::current().name().unwrap_or_default().to_string()
}
