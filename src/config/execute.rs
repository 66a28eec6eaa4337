use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_QUEUE_CAPACITY;
use crate::constants::DEFAULT_SLOW_TASK_THRESHOLD_MS;
use crate::Error;
use crate::Result;

/// Sizing of the partitioned execute engine
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteEngineConfig {
    /// Number of worker lanes. `0` means one lane per available CPU.
    /// Always rounded up to the next power of two.
    #[serde(default)]
    pub worker_count: usize,

    /// Bounded capacity of each lane; `dispatch` blocks once reached
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Execution time (ms) after which a task is logged as slow. Never enforced.
    #[serde(default = "default_slow_task_threshold_ms")]
    pub slow_task_threshold_ms: u64,
}

impl Default for ExecuteEngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 0,
            queue_capacity: default_queue_capacity(),
            slow_task_threshold_ms: default_slow_task_threshold_ms(),
        }
    }
}

impl ExecuteEngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "execute.queue_capacity must be greater than 0".into(),
            )));
        }
        if self.slow_task_threshold_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "execute.slow_task_threshold_ms must be at least 1ms".into(),
            )));
        }
        Ok(())
    }

    /// Lane count actually used by the engine
    pub fn effective_worker_count(&self) -> usize {
        let requested = if self.worker_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.worker_count
        };
        requested.next_power_of_two()
    }

    pub fn slow_task_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_task_threshold_ms)
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_slow_task_threshold_ms() -> u64 {
    DEFAULT_SLOW_TASK_THRESHOLD_MS
}
