//! Change and delete propagation.
//!
//! One task type carries the operation as a tag. Both variants share the
//! same skeleton: resolve the transport agent, build the data, ship it, then
//! record the outcome and hand failures to the resource type's retry policy.
//! Only the data building differs:
//! - CHANGE reads the latest state from storage at execution time, so merged
//!   or overwritten mutations are picked up as "latest wins"
//! - DELETE builds a tombstone without touching storage

use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::task::execute::panic_message;
use crate::task::execute::ExecuteTask;
use crate::DataOperation;
use crate::DistroCallback;
use crate::DistroComponentHolder;
use crate::DistroData;
use crate::DistroKey;
use crate::DistroRecordsHolder;
use crate::DistroTransportAgent;
use crate::Error;
use crate::Result;

pub struct DistroSyncTask {
    distro_key: DistroKey,
    action: DataOperation,
    components: Arc<DistroComponentHolder>,
    records: Arc<DistroRecordsHolder>,
}

impl DistroSyncTask {
    pub fn change(
        distro_key: DistroKey,
        components: Arc<DistroComponentHolder>,
        records: Arc<DistroRecordsHolder>,
    ) -> Self {
        Self {
            distro_key,
            action: DataOperation::Change,
            components,
            records,
        }
    }

    pub fn delete(
        distro_key: DistroKey,
        components: Arc<DistroComponentHolder>,
        records: Arc<DistroRecordsHolder>,
    ) -> Self {
        Self {
            distro_key,
            action: DataOperation::Delete,
            components,
            records,
        }
    }

    /// Task for a propagated operation. `Add` travels as a change;
    /// `Verify` and `Snapshot` are not propagated through this path.
    pub fn for_operation(
        distro_key: DistroKey,
        action: DataOperation,
        components: Arc<DistroComponentHolder>,
        records: Arc<DistroRecordsHolder>,
    ) -> Option<Self> {
        match action {
            DataOperation::Add | DataOperation::Change => Some(Self::change(distro_key, components, records)),
            DataOperation::Delete => Some(Self::delete(distro_key, components, records)),
            DataOperation::Verify | DataOperation::Snapshot => None,
        }
    }

    /// Operation to resubmit on retry
    pub fn get_data_operation(&self) -> DataOperation {
        self.action
    }

    pub fn distro_key(&self) -> &DistroKey {
        &self.distro_key
    }

    fn execute(&self) {
        let resource_type = self.distro_key.resource_type();
        let Some(agent) = self.components.find_transport_agent(resource_type) else {
            warn!(
                resource_type,
                "no transport agent registered, drop task {}", self
            );
            return;
        };

        debug!("[DISTRO-START] {}", self);
        if agent.support_callback_transport() {
            self.execute_with_callback(agent);
        } else {
            self.execute_blocking(agent);
        }
    }

    fn execute_blocking(
        &self,
        agent: Arc<dyn DistroTransportAgent>,
    ) {
        // a panicking storage or agent counts as a failed sync
        let shipped = panic::catch_unwind(AssertUnwindSafe(|| {
            let data = self.build_data()?;
            Some(agent.sync_data(data, self.distro_key.target_server()))
        }));

        match shipped {
            Ok(None) => {}
            Ok(Some(Ok(true))) => {
                self.records
                    .get_record(self.distro_key.resource_type())
                    .sync_success();
                debug!("[DISTRO-END] {} result: true", self);
            }
            Ok(Some(Ok(false))) => {
                debug!("[DISTRO-END] {} result: false", self);
                self.handle_failed();
            }
            Ok(Some(Err(e))) => {
                warn!("[DISTRO-FAILED] {} error: {}", self, e);
                self.handle_failed();
            }
            Err(payload) => {
                error!("[DISTRO-FAILED] {} panicked: {}", self, panic_message(payload.as_ref()));
                self.handle_failed();
            }
        }
    }

    fn execute_with_callback(
        &self,
        agent: Arc<dyn DistroTransportAgent>,
    ) {
        let completed = Arc::new(AtomicBool::new(false));
        let shipped = panic::catch_unwind(AssertUnwindSafe(|| {
            let Some(data) = self.build_data() else {
                return;
            };
            let callback = Box::new(SyncTaskCallback {
                distro_key: self.distro_key.clone(),
                action: self.action,
                components: self.components.clone(),
                records: self.records.clone(),
                completed: completed.clone(),
            });
            agent.sync_data_with_callback(data, self.distro_key.target_server(), callback);
        }));

        if let Err(payload) = shipped {
            error!("[DISTRO-FAILED] {} panicked: {}", self, panic_message(payload.as_ref()));
            // the callback may have run before the panic
            if !completed.load(Ordering::Acquire) {
                self.handle_failed();
            }
        }
    }

    fn handle_failed(&self) {
        handle_failed_task(&self.distro_key, self.action, &self.components, &self.records);
    }

    /// `None` means there is nothing to ship; the task ends without failure
    fn build_data(&self) -> Option<DistroData> {
        match self.action {
            DataOperation::Delete => Some(DistroData::tombstone(self.distro_key.clone())),
            _ => {
                let resource_type = self.distro_key.resource_type();
                let Some(storage) = self.components.find_data_storage(resource_type) else {
                    warn!(
                        resource_type,
                        "no data storage registered, drop task {}", self
                    );
                    return None;
                };
                match storage.get_distro_data(&self.distro_key) {
                    Some(data) => Some(data.with_operation(DataOperation::Change)),
                    None => {
                        info!("[DISTRO] data not found for {}, skip sync", self);
                        None
                    }
                }
            }
        }
    }
}

impl ExecuteTask for DistroSyncTask {
    fn run(self: Box<Self>) -> Result<()> {
        self.execute();
        Ok(())
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DistroSyncTask {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "DistroSyncTask({}, {})", self.action, self.distro_key)
    }
}

impl fmt::Debug for DistroSyncTask {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DistroSyncTask")
            .field("distro_key", &self.distro_key)
            .field("action", &self.action)
            .finish()
    }
}

/// Completes a callback-driven sync. May run on a transport thread while the
/// worker lane moves on to later tasks.
struct SyncTaskCallback {
    distro_key: DistroKey,
    action: DataOperation,
    components: Arc<DistroComponentHolder>,
    records: Arc<DistroRecordsHolder>,
    completed: Arc<AtomicBool>,
}

impl DistroCallback for SyncTaskCallback {
    fn on_success(self: Box<Self>) {
        self.completed.store(true, Ordering::Release);
        self.records
            .get_record(self.distro_key.resource_type())
            .sync_success();
        debug!("[DISTRO-END] {} {} result: true", self.action, self.distro_key);
    }

    fn on_failed(
        self: Box<Self>,
        cause: Option<Error>,
    ) {
        self.completed.store(true, Ordering::Release);
        match cause {
            Some(e) => warn!("[DISTRO-FAILED] {} {} error: {}", self.action, self.distro_key, e),
            None => debug!("[DISTRO-END] {} {} result: false", self.action, self.distro_key),
        }
        handle_failed_task(&self.distro_key, self.action, &self.components, &self.records);
    }
}

/// Count the failure, then hand the key to the resource type's retry policy.
/// Without a registered handler the task is dropped.
pub(crate) fn handle_failed_task(
    distro_key: &DistroKey,
    action: DataOperation,
    components: &DistroComponentHolder,
    records: &DistroRecordsHolder,
) {
    let resource_type = distro_key.resource_type();
    records.get_record(resource_type).sync_fail();

    match components.find_failed_task_handler(resource_type) {
        Some(handler) => handler.retry(distro_key, action),
        None => warn!(
            resource_type,
            "no failed task handler registered, drop {} {}", action, distro_key
        ),
    }
}
