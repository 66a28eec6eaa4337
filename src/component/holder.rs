use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::DistroDataProcessor;
use super::DistroDataStorage;
use super::DistroFailedTaskHandler;
use super::DistroTransportAgent;

/// Resource-type keyed lookup table of Distro components.
///
/// Lookups are lock-free reads on worker threads; registration usually happens
/// once at startup but may race with lookups safely. A missing entry is
/// reported as `None` so that callers can log and drop.
#[derive(Default)]
pub struct DistroComponentHolder {
    transport_agents: DashMap<String, Arc<dyn DistroTransportAgent>>,
    data_storages: DashMap<String, Arc<dyn DistroDataStorage>>,
    failed_task_handlers: DashMap<String, Arc<dyn DistroFailedTaskHandler>>,
    data_processors: DashMap<String, Arc<dyn DistroDataProcessor>>,
}

impl std::fmt::Debug for DistroComponentHolder {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DistroComponentHolder")
            .field("data_storage_types", &self.data_storage_types())
            .field("transport_agents", &self.transport_agents.len())
            .field("failed_task_handlers", &self.failed_task_handlers.len())
            .field("data_processors", &self.data_processors.len())
            .finish()
    }
}

impl DistroComponentHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_transport_agent(
        &self,
        resource_type: &str,
        agent: Arc<dyn DistroTransportAgent>,
    ) {
        debug!(resource_type, "register distro transport agent");
        self.transport_agents.insert(resource_type.to_string(), agent);
    }

    pub fn register_data_storage(
        &self,
        resource_type: &str,
        storage: Arc<dyn DistroDataStorage>,
    ) {
        debug!(resource_type, "register distro data storage");
        self.data_storages.insert(resource_type.to_string(), storage);
    }

    pub fn register_failed_task_handler(
        &self,
        resource_type: &str,
        handler: Arc<dyn DistroFailedTaskHandler>,
    ) {
        debug!(resource_type, "register distro failed task handler");
        self.failed_task_handlers
            .insert(resource_type.to_string(), handler);
    }

    /// Registered under [`DistroDataProcessor::process_type`]
    pub fn register_data_processor(
        &self,
        processor: Arc<dyn DistroDataProcessor>,
    ) {
        let resource_type = processor.process_type();
        debug!(resource_type = %resource_type, "register distro data processor");
        self.data_processors.insert(resource_type, processor);
    }

    pub fn find_transport_agent(
        &self,
        resource_type: &str,
    ) -> Option<Arc<dyn DistroTransportAgent>> {
        self.transport_agents.get(resource_type).map(|e| e.value().clone())
    }

    pub fn find_data_storage(
        &self,
        resource_type: &str,
    ) -> Option<Arc<dyn DistroDataStorage>> {
        self.data_storages.get(resource_type).map(|e| e.value().clone())
    }

    pub fn find_failed_task_handler(
        &self,
        resource_type: &str,
    ) -> Option<Arc<dyn DistroFailedTaskHandler>> {
        self.failed_task_handlers
            .get(resource_type)
            .map(|e| e.value().clone())
    }

    pub fn find_data_processor(
        &self,
        resource_type: &str,
    ) -> Option<Arc<dyn DistroDataProcessor>> {
        self.data_processors.get(resource_type).map(|e| e.value().clone())
    }

    /// Resource types with a registered storage, sorted
    pub fn data_storage_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.data_storages.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Drop every component bound to `resource_type`
    pub fn unregister(
        &self,
        resource_type: &str,
    ) {
        self.transport_agents.remove(resource_type);
        self.data_storages.remove(resource_type);
        self.failed_task_handlers.remove(resource_type);
        self.data_processors.remove(resource_type);
    }
}
