use std::sync::Arc;

use tracing::warn;

use super::DelayTaskProcessor;
use super::DistroDelayTask;
use crate::DistroComponentHolder;
use crate::DistroRecordsHolder;
use crate::DistroSyncTask;
use crate::ExecuteTaskEngine;

/// Turns due delay tasks into [`DistroSyncTask`]s on the lane owned by the
/// task's resource key.
pub struct DistroDelayTaskProcessor {
    execute_engine: Arc<ExecuteTaskEngine>,
    components: Arc<DistroComponentHolder>,
    records: Arc<DistroRecordsHolder>,
}

impl DistroDelayTaskProcessor {
    pub fn new(
        execute_engine: Arc<ExecuteTaskEngine>,
        components: Arc<DistroComponentHolder>,
        records: Arc<DistroRecordsHolder>,
    ) -> Self {
        Self {
            execute_engine,
            components,
            records,
        }
    }
}

impl DelayTaskProcessor for DistroDelayTaskProcessor {
    fn process(
        &self,
        task: &DistroDelayTask,
    ) -> bool {
        let distro_key = task.distro_key();
        let Some(sync_task) = DistroSyncTask::for_operation(
            distro_key.clone(),
            task.action(),
            self.components.clone(),
            self.records.clone(),
        ) else {
            warn!("unsupported delay task operation {} for {}, drop", task.action(), distro_key);
            return true;
        };

        match self.execute_engine.dispatch(distro_key, Box::new(sync_task)) {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to dispatch delay task {} {}: {}", task.action(), distro_key, e);
                false
            }
        }
    }
}
