use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::Hasher;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::constants::SNAPSHOT_RESOURCE_KEY;
use crate::DataOperation;
use crate::DistroData;
use crate::DistroDataProcessor;
use crate::DistroDataStorage;
use crate::DistroKey;
use crate::Result;
use crate::StorageError;

/// In-memory store for one resource type, keyed by resource key.
///
/// Serves the local snapshot to outgoing sync tasks and applies data
/// received from peers.
///
/// Snapshot payload: bincode encoded `BTreeMap<String, Bytes>`.
/// Verify payload: 8 byte big-endian digest of the stored value.
#[derive(Debug)]
pub struct MemoryDataStorage {
    resource_type: String,
    data: DashMap<String, Bytes>,
}

impl MemoryDataStorage {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            data: DashMap::new(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn put(
        &self,
        resource_key: impl Into<String>,
        value: Bytes,
    ) -> Option<Bytes> {
        self.data.insert(resource_key.into(), value)
    }

    pub fn get(
        &self,
        resource_key: &str,
    ) -> Option<Bytes> {
        self.data.get(resource_key).map(|v| v.value().clone())
    }

    pub fn remove(
        &self,
        resource_key: &str,
    ) -> Option<Bytes> {
        self.data.remove(resource_key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sorted resource keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn encode_snapshot(&self) -> Result<Bytes> {
        let entries: BTreeMap<String, Bytes> = self
            .data
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        Ok(Bytes::from(bincode::serialize(&entries)?))
    }

    fn decode_snapshot(
        &self,
        snapshot: &DistroData,
    ) -> Result<BTreeMap<String, Bytes>> {
        let content = snapshot.content().ok_or_else(|| StorageError::InvalidPayload {
            resource_type: self.resource_type.clone(),
            reason: "snapshot without content".to_string(),
        })?;
        Ok(bincode::deserialize(content)?)
    }

    fn apply(
        &self,
        data: DistroData,
    ) -> bool {
        let resource_key = data.distro_key().resource_key().to_string();
        match data.operation() {
            DataOperation::Add | DataOperation::Change => match data.into_content() {
                Some(value) => {
                    self.put(resource_key, value);
                    true
                }
                None => {
                    warn!(%resource_key, "change without content, ignored");
                    false
                }
            },
            DataOperation::Delete => {
                self.remove(&resource_key);
                true
            }
            DataOperation::Snapshot => self.process_snapshot(data),
            DataOperation::Verify => {
                warn!(%resource_key, "verify data must go through process_verify_data");
                false
            }
        }
    }
}

pub(crate) fn digest(value: &[u8]) -> Bytes {
    let mut hasher = DefaultHasher::new();
    hasher.write(value);
    Bytes::copy_from_slice(&hasher.finish().to_be_bytes())
}

impl DistroDataStorage for MemoryDataStorage {
    fn get_distro_data(
        &self,
        distro_key: &DistroKey,
    ) -> Option<DistroData> {
        self.get(distro_key.resource_key())
            .map(|value| DistroData::new(distro_key.clone(), value))
    }

    fn get_datum_snapshot(&self) -> Option<DistroData> {
        match self.encode_snapshot() {
            Ok(payload) => {
                let key = DistroKey::local(SNAPSHOT_RESOURCE_KEY, self.resource_type.clone());
                Some(DistroData::new(key, payload).with_operation(DataOperation::Snapshot))
            }
            Err(e) => {
                error!(resource_type = %self.resource_type, "failed to encode snapshot: {}", e);
                None
            }
        }
    }

    fn get_verify_data(&self) -> Vec<DistroData> {
        self.data
            .iter()
            .map(|e| {
                let key = DistroKey::local(e.key().clone(), self.resource_type.clone());
                DistroData::new(key, digest(e.value())).with_operation(DataOperation::Verify)
            })
            .collect()
    }
}

impl DistroDataProcessor for MemoryDataStorage {
    fn process_type(&self) -> String {
        self.resource_type.clone()
    }

    fn process_data(
        &self,
        data: DistroData,
    ) -> bool {
        if data.resource_type() != self.resource_type {
            warn!(
                expected = %self.resource_type,
                actual = data.resource_type(),
                "data of another resource type, ignored"
            );
            return false;
        }
        self.apply(data)
    }

    /// `true` when the local value matches the peer's digest
    fn process_verify_data(
        &self,
        verify_data: DistroData,
        source_address: &str,
    ) -> bool {
        let resource_key = verify_data.distro_key().resource_key();
        let Some(local) = self.get(resource_key) else {
            debug!(resource_key, source_address, "verify failed, key unknown");
            return false;
        };
        let matched = verify_data.content() == Some(&digest(&local));
        if !matched {
            debug!(resource_key, source_address, "verify failed, digest mismatch");
        }
        matched
    }

    fn process_snapshot(
        &self,
        snapshot: DistroData,
    ) -> bool {
        match self.decode_snapshot(&snapshot) {
            Ok(entries) => {
                let loaded = entries.len();
                for (key, value) in entries {
                    self.data.insert(key, value);
                }
                debug!(resource_type = %self.resource_type, loaded, "snapshot loaded");
                true
            }
            Err(e) => {
                warn!(resource_type = %self.resource_type, "failed to load snapshot: {}", e);
                false
            }
        }
    }
}
