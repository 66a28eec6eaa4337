//! Startup snapshot load.
//!
//! A node joining the cluster pulls one full snapshot per resource type from
//! any peer before it reports itself initialized. A resource type counts as
//! loaded once one peer's snapshot has been applied; later rounds only retry
//! the types still missing.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ClusterMembers;
use crate::DistroComponentHolder;

pub(crate) struct SnapshotLoader {
    members: Arc<dyn ClusterMembers>,
    components: Arc<DistroComponentHolder>,
    loaded_types: DashSet<String>,
    initialized: AtomicBool,
}

impl SnapshotLoader {
    pub(crate) fn new(
        members: Arc<dyn ClusterMembers>,
        components: Arc<DistroComponentHolder>,
    ) -> Self {
        Self {
            members,
            components,
            loaded_types: DashSet::new(),
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// One load round over every resource type with a registered storage.
    /// Returns `true` once every type is loaded.
    pub(crate) fn load_all(&self) -> bool {
        if self.is_initialized() {
            return true;
        }

        let peers = self.members.peers();
        if peers.is_empty() {
            info!("[DISTRO-INIT] no peers, nothing to load");
            self.initialized.store(true, Ordering::Release);
            return true;
        }

        let mut all_loaded = true;
        for resource_type in self.components.data_storage_types() {
            if self.loaded_types.contains(&resource_type) {
                continue;
            }
            if self.load_resource_type(&resource_type, &peers) {
                self.loaded_types.insert(resource_type);
            } else {
                all_loaded = false;
            }
        }

        if all_loaded {
            info!(loaded = self.loaded_types.len(), "[DISTRO-INIT] snapshot load completed");
            self.initialized.store(true, Ordering::Release);
        }
        all_loaded
    }

    fn load_resource_type(
        &self,
        resource_type: &str,
        peers: &[String],
    ) -> bool {
        let Some(agent) = self.components.find_transport_agent(resource_type) else {
            warn!(resource_type, "no transport agent registered, can't load snapshot");
            return false;
        };
        let Some(processor) = self.components.find_data_processor(resource_type) else {
            warn!(resource_type, "no data processor registered, can't load snapshot");
            return false;
        };

        for peer in peers {
            match agent.get_datum_snapshot(peer) {
                Ok(Some(snapshot)) => {
                    if processor.process_snapshot(snapshot) {
                        info!(resource_type, peer = %peer, "[DISTRO-INIT] snapshot loaded");
                        return true;
                    }
                    warn!(resource_type, peer = %peer, "[DISTRO-INIT] snapshot refused by processor");
                }
                Ok(None) => debug!(resource_type, peer = %peer, "[DISTRO-INIT] peer has no snapshot"),
                Err(e) => warn!(resource_type, peer = %peer, "[DISTRO-INIT] snapshot pull failed: {}", e),
            }
        }
        false
    }
}
