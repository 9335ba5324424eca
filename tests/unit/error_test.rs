//! Tests for error types

use std::error::Error as _;

use threadkit::core::{ConfigError, PoolError, TimerError};

#[test]
fn test_pool_closed_error() {
    assert_eq!(PoolError::Closed.to_string(), "pool closed");
}

#[test]
fn test_task_panicked_error() {
    let err = PoolError::TaskPanicked("boom".to_string());
    assert_eq!(err.to_string(), "task panicked: boom");
}

#[test]
fn test_pool_spawn_error_has_source() {
    let err = PoolError::Spawn(std::io::Error::other("no threads"));
    assert!(err.to_string().contains("no threads"));
    assert!(err.source().is_some());
}

#[test]
fn test_timer_errors() {
    assert_eq!(TimerError::Closed.to_string(), "timer service closed");
    assert_eq!(
        TimerError::ForeignTimer(7).to_string(),
        "timer 7 is not owned by this service"
    );
    assert!(TimerError::ZeroInterval.to_string().contains("greater than zero"));
}

#[test]
fn test_config_invalid_env_error() {
    let err = ConfigError::InvalidEnv {
        key: "THREADKIT_WORKERS".to_string(),
        value: "x".to_string(),
    };
    assert_eq!(err.to_string(), "invalid value `x` for THREADKIT_WORKERS");
}

#[test]
fn test_errors_convert_into_anyhow() {
    let err: anyhow::Error = PoolError::Timeout.into();
    assert!(err.downcast_ref::<PoolError>().is_some());
}
