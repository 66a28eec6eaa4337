//! Delay and merge stage in front of the execute engine.
//!
//! Local mutations do not hit the worker lanes directly. Each one parks a
//! [`DistroDelayTask`] per destination, keyed by the full [`DistroKey`]. A
//! burst of mutations on one entity collapses into a single propagation
//! once the delay has elapsed.

mod engine;
mod processor;
pub use engine::*;
pub use processor::*;

#[cfg(test)]
mod delay_test;

use std::time::Duration;
use std::time::Instant;

#[cfg(test)]
use mockall::automock;

use crate::DataOperation;
use crate::DistroKey;

#[derive(Debug, Clone)]
pub struct DistroDelayTask {
    distro_key: DistroKey,
    action: DataOperation,
    delay: Duration,
    last_process_time: Instant,
}

impl DistroDelayTask {
    pub fn new(
        distro_key: DistroKey,
        action: DataOperation,
        delay: Duration,
    ) -> Self {
        Self {
            distro_key,
            action,
            delay,
            last_process_time: Instant::now(),
        }
    }

    pub fn distro_key(&self) -> &DistroKey {
        &self.distro_key
    }

    pub fn action(&self) -> DataOperation {
        self.action
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Fold a pending task for the same key into this newer one.
    ///
    /// The newer operation wins. The older start time is kept, so a steady
    /// stream of mutations cannot postpone propagation forever.
    pub fn merge(
        &mut self,
        older: &DistroDelayTask,
    ) {
        if older.last_process_time < self.last_process_time {
            self.last_process_time = older.last_process_time;
        }
    }

    pub fn should_process(
        &self,
        now: Instant,
    ) -> bool {
        now.saturating_duration_since(self.last_process_time) >= self.delay
    }

    pub(crate) fn reset_process_time(&mut self) {
        self.last_process_time = Instant::now();
    }
}

/// Consumes delay tasks whose delay has elapsed.
#[cfg_attr(test, automock)]
pub trait DelayTaskProcessor: Send + Sync + 'static {
    /// `false` puts the task back for another attempt
    fn process(
        &self,
        task: &DistroDelayTask,
    ) -> bool;
}
