use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Timing of change/delete propagation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Delay (ms) between a local mutation and its propagation. Mutations of the
    /// same key inside this window are merged.
    #[serde(default = "default_sync_delay_ms")]
    pub sync_delay_ms: u64,

    /// Delay (ms) before a failed propagation is attempted again
    #[serde(default = "default_sync_retry_delay_ms")]
    pub sync_retry_delay_ms: u64,

    /// Per-request timeout (ms) handed to transport agents, see
    /// [`crate::LocalTransportAgent::with_runtime`]
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    /// Delay (ms) between two rounds of the startup snapshot load while
    /// some resource type is still missing
    #[serde(default = "default_load_retry_delay_ms")]
    pub load_retry_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_delay_ms: default_sync_delay_ms(),
            sync_retry_delay_ms: default_sync_retry_delay_ms(),
            sync_timeout_ms: default_sync_timeout_ms(),
            load_retry_delay_ms: default_load_retry_delay_ms(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sync_retry_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "sync.sync_retry_delay_ms cannot be 0".into(),
            )));
        }
        if self.sync_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "sync.sync_timeout_ms must be at least 1ms".into(),
            )));
        }
        if self.load_retry_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "sync.load_retry_delay_ms cannot be 0".into(),
            )));
        }
        Ok(())
    }

    pub fn sync_delay(&self) -> Duration {
        Duration::from_millis(self.sync_delay_ms)
    }

    pub fn sync_retry_delay(&self) -> Duration {
        Duration::from_millis(self.sync_retry_delay_ms)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn load_retry_delay(&self) -> Duration {
        Duration::from_millis(self.load_retry_delay_ms)
    }
}

fn default_sync_delay_ms() -> u64 {
    1000
}
fn default_sync_retry_delay_ms() -> u64 {
    3000
}
fn default_sync_timeout_ms() -> u64 {
    3000
}
fn default_load_retry_delay_ms() -> u64 {
    30000
}
