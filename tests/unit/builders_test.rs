//! Tests for builder modules

use threadkit::builders::{build_context, build_timer_service, build_worker_pool};
use threadkit::config::{RuntimeConfig, TimerServiceConfig, WorkerPoolConfig};
use threadkit::core::PoolState;

#[test]
fn test_build_worker_pool_from_config() {
    let pool = build_worker_pool(
        &WorkerPoolConfig::new()
            .with_worker_count(2)
            .with_queue_capacity(4),
    )
    .unwrap();
    assert_eq!(pool.thread_count(), 2);
    assert_eq!(pool.config().queue_capacity, 4);
    assert_eq!(pool.submit(|| 5).unwrap().wait().unwrap(), 5);
}

#[test]
fn test_build_worker_pool_rejects_invalid_config() {
    let cfg = WorkerPoolConfig::new().with_thread_name_prefix("");
    assert!(build_worker_pool(&cfg).is_err());
}

#[test]
fn test_build_timer_service_from_config() {
    let service = build_timer_service(&TimerServiceConfig::default()).unwrap();
    assert_eq!(service.active_timer_count(), 0);
}

#[test]
fn test_build_context_defaults() {
    let mut cfg = RuntimeConfig::default();
    cfg.pool.worker_count = 2;

    let ctx = build_context(&cfg).unwrap();
    assert_eq!(ctx.pool().thread_count(), 2);
    assert_eq!(ctx.pool().state(), PoolState::Running);
    ctx.shutdown(true);
}

#[test]
fn test_build_context_reports_invalid_config() {
    let mut cfg = RuntimeConfig::default();
    cfg.timers.thread_name_prefix = String::new();

    let err = build_context(&cfg).unwrap_err();
    assert!(format!("{err:#}").contains("runtime configuration invalid"));
}
