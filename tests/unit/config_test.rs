//! Tests for configuration parsing and validation

use std::collections::HashMap;

use threadkit::config::{
    RuntimeConfig, TimerServiceConfig, WorkerPoolConfig, ENV_QUEUE_CAPACITY, ENV_THREAD_PREFIX,
    ENV_TIMER_THREAD_PREFIX, ENV_WORKERS,
};
use threadkit::core::ConfigError;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_pool_config_defaults() {
    let cfg = WorkerPoolConfig::default();
    assert!(cfg.worker_count >= 1);
    assert_eq!(cfg.queue_capacity, 0);
    assert_eq!(cfg.thread_name_prefix, "pool-worker");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_pool_config_builder() {
    let cfg = WorkerPoolConfig::new()
        .with_worker_count(3)
        .with_queue_capacity(16)
        .with_thread_name_prefix("io")
        .with_thread_stack_size(256 * 1024);
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.queue_capacity, 16);
    assert_eq!(cfg.thread_name_prefix, "io");
    assert_eq!(cfg.thread_stack_size, 256 * 1024);
}

#[test]
fn test_pool_config_invalid_prefix() {
    let cfg = WorkerPoolConfig::new().with_thread_name_prefix("  ");
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_pool_config_invalid_stack_size() {
    let cfg = WorkerPoolConfig::new().with_thread_stack_size(1024);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_timer_config_invalid_prefix() {
    let cfg = TimerServiceConfig::new().with_thread_name_prefix("");
    assert!(cfg.validate().is_err());
}

#[test]
fn test_runtime_config_from_json_partial() {
    let cfg = RuntimeConfig::from_json_str(
        r#"{ "pool": { "worker_count": 2, "queue_capacity": 8 }, "timers": { "thread_name_prefix": "tick" } }"#,
    )
    .unwrap();
    assert_eq!(cfg.pool.worker_count, 2);
    assert_eq!(cfg.pool.queue_capacity, 8);
    assert_eq!(cfg.pool.thread_name_prefix, "pool-worker");
    assert_eq!(cfg.timers.thread_name_prefix, "tick");
}

#[test]
fn test_runtime_config_from_json_malformed() {
    assert!(matches!(
        RuntimeConfig::from_json_str("{ not json"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_runtime_config_from_json_invalid_value() {
    let err = RuntimeConfig::from_json_str(r#"{ "timers": { "thread_name_prefix": "" } }"#)
        .unwrap_err();
    assert!(err.to_string().contains("timers invalid"));
}

#[test]
fn test_runtime_config_json_roundtrip_preserves_values() {
    let mut cfg = RuntimeConfig::default();
    cfg.pool.worker_count = 5;
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_runtime_config_from_lookup_overrides() {
    let cfg = RuntimeConfig::from_lookup(lookup(&[
        (ENV_WORKERS, "6"),
        (ENV_QUEUE_CAPACITY, " 32 "),
        (ENV_THREAD_PREFIX, "job"),
        (ENV_TIMER_THREAD_PREFIX, "clock"),
    ]))
    .unwrap();
    assert_eq!(cfg.pool.worker_count, 6);
    assert_eq!(cfg.pool.queue_capacity, 32);
    assert_eq!(cfg.pool.thread_name_prefix, "job");
    assert_eq!(cfg.timers.thread_name_prefix, "clock");
}

#[test]
fn test_runtime_config_from_lookup_empty_uses_defaults() {
    let cfg = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, RuntimeConfig::default());
}

#[test]
fn test_runtime_config_from_lookup_bad_number() {
    let err = RuntimeConfig::from_lookup(lookup(&[(ENV_WORKERS, "many")])).unwrap_err();
    match err {
        ConfigError::InvalidEnv { key, value } => {
            assert_eq!(key, ENV_WORKERS);
            assert_eq!(value, "many");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
