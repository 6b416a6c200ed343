use std::time::Duration;

use aigc_core::env;
use aigc_core::error::CoreError;

/// Worker pool sizing and execution limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Workers started up front and kept for the dispatcher's lifetime.
    pub core_workers: usize,
    /// Upper bound on concurrently running workers.
    pub max_workers: usize,
    /// Bounded FIFO of tasks waiting for a worker.
    pub queue_capacity: usize,
    /// How long a burst worker waits for work before exiting.
    pub keep_alive: Duration,
    /// Per provider call limit. `None` waits indefinitely.
    pub provider_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            core_workers: 5,
            max_workers: 20,
            queue_capacity: 100,
            keep_alive: Duration::from_secs(60),
            provider_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `DISPATCH_CORE_WORKERS`    | `5`     |
    /// | `DISPATCH_MAX_WORKERS`     | `20`    |
    /// | `DISPATCH_QUEUE_CAPACITY`  | `100`   |
    /// | `DISPATCH_KEEP_ALIVE_SECS` | `60`    |
    /// | `PROVIDER_TIMEOUT_SECS`    | unset   |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        let config = Self {
            core_workers: env::parse_or("DISPATCH_CORE_WORKERS", defaults.core_workers)?,
            max_workers: env::parse_or("DISPATCH_MAX_WORKERS", defaults.max_workers)?,
            queue_capacity: env::parse_or("DISPATCH_QUEUE_CAPACITY", defaults.queue_capacity)?,
            keep_alive: Duration::from_secs(env::parse_or(
                "DISPATCH_KEEP_ALIVE_SECS",
                defaults.keep_alive.as_secs(),
            )?),
            provider_timeout: env::parse_opt::<u64>("PROVIDER_TIMEOUT_SECS")?
                .map(Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rules:
    /// - At least one core worker.
    /// - `max_workers` not below `core_workers`.
    /// - A queue of at least one slot.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.core_workers == 0 {
            return Err(CoreError::Validation(
                "Dispatcher needs at least one core worker".to_string(),
            ));
        }
        if self.max_workers < self.core_workers {
            return Err(CoreError::Validation(format!(
                "Max workers ({}) must not be below core workers ({})",
                self.max_workers, self.core_workers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::Validation(
                "Dispatch queue capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
