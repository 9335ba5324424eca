//! Configuration models for the worker pool and the timer service.

pub mod pool;

pub use pool::{TimerServiceConfig, WorkerPoolConfig};

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

/// Environment variable overriding [`WorkerPoolConfig::worker_count`].
pub const ENV_WORKERS: &str = "THREADKIT_WORKERS";
/// Environment variable overriding [`WorkerPoolConfig::queue_capacity`].
pub const ENV_QUEUE_CAPACITY: &str = "THREADKIT_QUEUE_CAPACITY";
/// Environment variable overriding [`WorkerPoolConfig::thread_name_prefix`].
pub const ENV_THREAD_PREFIX: &str = "THREADKIT_THREAD_PREFIX";
/// Environment variable overriding [`TimerServiceConfig::thread_name_prefix`].
pub const ENV_TIMER_THREAD_PREFIX: &str = "THREADKIT_TIMER_THREAD_PREFIX";

/// Root configuration: one worker pool and one timer service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker pool settings.
    pub pool: WorkerPoolConfig,
    /// Timer service settings.
    pub timers: TimerServiceConfig,
}

impl RuntimeConfig {
    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the section that failed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("pool invalid: {e}")))?;
        self.timers
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("timers invalid: {e}")))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `THREADKIT_*`
    /// environment variables. A `.env` file in the working directory is
    /// loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable numbers and
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading variables through
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(workers) = parse_usize(&lookup, ENV_WORKERS)? {
            cfg.pool.worker_count = workers;
        }
        if let Some(capacity) = parse_usize(&lookup, ENV_QUEUE_CAPACITY)? {
            cfg.pool.queue_capacity = capacity;
        }
        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            cfg.pool.thread_name_prefix = prefix;
        }
        if let Some(prefix) = lookup(ENV_TIMER_THREAD_PREFIX) {
            cfg.timers.thread_name_prefix = prefix;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_usize<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}
