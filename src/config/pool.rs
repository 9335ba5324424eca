//! Worker pool and timer service configuration structures.

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads. Zero runs tasks inline on the submitter.
    pub worker_count: usize,
    /// Maximum queued tasks before `submit` blocks. Zero means unbounded.
    pub queue_capacity: usize,
    /// Worker thread names are `{prefix}-{index}`.
    pub thread_name_prefix: String,
    /// Stack size for each worker thread, in bytes.
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            queue_capacity: 0,
            thread_name_prefix: "pool-worker".into(),
            thread_stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration: one worker per CPU, unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the queue capacity (0 = unbounded).
    #[must_use]
    pub const fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thread_settings(&self.thread_name_prefix, self.thread_stack_size)
    }
}

/// Timer service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerServiceConfig {
    /// Prefix for the scheduler and dispatcher thread names.
    pub thread_name_prefix: String,
    /// Stack size for both timer threads, in bytes.
    pub thread_stack_size: usize,
}

impl Default for TimerServiceConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "timer".into(),
            thread_stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl TimerServiceConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timer thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thread_settings(&self.thread_name_prefix, self.thread_stack_size)
    }
}

fn validate_thread_settings(prefix: &str, stack_size: usize) -> Result<(), ConfigError> {
    if prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("thread_name_prefix must not be empty".into()));
    }
    if prefix.contains('\0') {
        return Err(ConfigError::Invalid("thread_name_prefix must not contain NUL".into()));
    }
    if stack_size < MIN_STACK_SIZE {
        return Err(ConfigError::Invalid(format!(
            "thread_stack_size must be at least {MIN_STACK_SIZE} bytes"
        )));
    }
    Ok(())
}
