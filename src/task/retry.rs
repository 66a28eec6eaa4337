use std::sync::Weak;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::DataOperation;
use crate::DistroDelayTask;
use crate::DistroDelayTaskEngine;
use crate::DistroFailedTaskHandler;
use crate::DistroKey;

/// Default retry policy: put the failed key back into the delay engine after
/// a fixed delay, as many times as it takes.
///
/// The resubmission does not override a task already pending for the same
/// key, since that one is newer. Transports should report success for
/// targets that have left the cluster, otherwise retries for them never end.
#[derive(Debug, Clone)]
pub struct DelayedRetryHandler {
    delay_engine: Weak<DistroDelayTaskEngine>,
    retry_delay: Duration,
}

impl DelayedRetryHandler {
    pub fn new(
        delay_engine: Weak<DistroDelayTaskEngine>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            delay_engine,
            retry_delay,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl DistroFailedTaskHandler for DelayedRetryHandler {
    fn retry(
        &self,
        distro_key: &DistroKey,
        action: DataOperation,
    ) {
        match action {
            DataOperation::Add | DataOperation::Change | DataOperation::Delete => {}
            DataOperation::Verify | DataOperation::Snapshot => {
                warn!("retry not supported for {} {}, drop", action, distro_key);
                return;
            }
        }
        let Some(delay_engine) = self.delay_engine.upgrade() else {
            warn!("delay engine released, drop retry {} {}", action, distro_key);
            return;
        };
        debug!(
            "retry {} {} in {} ms",
            action,
            distro_key,
            self.retry_delay.as_millis()
        );
        delay_engine.add_task_if_absent(DistroDelayTask::new(distro_key.clone(), action, self.retry_delay));
    }
}
