//! Error types for the worker pool and the timer service.

use thiserror::Error;

/// Errors produced by the worker pool and its task queue.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool is closed; the task was rejected or discarded.
    #[error("pool closed")]
    Closed,
    /// The task panicked while running on a worker.
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    /// Waiting on a task handle timed out.
    #[error("timed out waiting for task result")]
    Timeout,
    /// The result was already taken from this handle.
    #[error("task result already taken")]
    ResultTaken,
    /// A worker thread could not be created.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The pool configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors produced by the timer service.
#[derive(Debug, Error)]
pub enum TimerError {
    /// The owning timer service has been shut down or dropped.
    #[error("timer service closed")]
    Closed,
    /// A periodic timer needs a non-zero interval.
    #[error("periodic timer interval must be greater than zero")]
    ZeroInterval,
    /// The timer service configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The handle does not belong to this timer service.
    #[error("timer {0} is not owned by this service")]
    ForeignTimer(u64),
    /// A timer thread could not be created.
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Configuration parsing and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// An environment override held an unusable value.
    #[error("invalid value `{value}` for {key}")]
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Raw value found.
        value: String,
    },
    /// A field failed validation.
    #[error("{0}")]
    Invalid(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
