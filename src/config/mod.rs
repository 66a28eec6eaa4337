//! Configuration management for the Distro replication core.
//!
//! Provides layered configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file (TOML)
//! 3. Environment variables (highest priority), e.g. `DISTRO__EXECUTE__QUEUE_CAPACITY=1024`
//!

mod delay;
mod execute;
mod sync;
pub use delay::*;
pub use execute::*;
pub use sync::*;


//---
use config::{Config, Environment, File};
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DistroSettings {
    /// Partitioned worker lanes
    #[serde(default)]
    pub execute: ExecuteEngineConfig,
    /// Delay/merge stage in front of the worker lanes
    #[serde(default)]
    pub delay: DelayEngineConfig,
    /// Propagation delays and retry timing
    #[serde(default)]
    pub sync: SyncConfig,
}

impl DistroSettings {
    /// Load configuration from multiple sources with priority:
    /// 1. Defaults
    /// 2. Config file, if `path` is given
    /// 3. Environment variables
    ///
    /// # Returns
    /// Merged and validated configuration
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder().add_source(Config::try_from(&DistroSettings::default())?);

        if let Some(path) = path {
            config = config.add_source(File::with_name(path).required(true));
        }

        config = config.add_source(
            Environment::with_prefix("DISTRO")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: DistroSettings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates all subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.execute.validate()?;
        self.delay.validate()?;
        self.sync.validate()?;
        Ok(())
    }
}
