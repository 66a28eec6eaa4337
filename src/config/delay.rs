use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DelayEngineConfig {
    /// Tick (ms) at which pending delay tasks are checked
    #[serde(default = "default_process_interval_ms")]
    pub process_interval_ms: u64,
}

impl Default for DelayEngineConfig {
    fn default() -> Self {
        Self {
            process_interval_ms: default_process_interval_ms(),
        }
    }
}

impl DelayEngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.process_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "delay.process_interval_ms cannot be 0".into(),
            )));
        }
        Ok(())
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }
}

fn default_process_interval_ms() -> u64 {
    100
}
