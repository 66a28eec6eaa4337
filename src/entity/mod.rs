//! Replication unit model.
//!
//! A [`DistroKey`] names what changed and where it is going; a [`DistroData`]
//! carries the payload that was read from the local store at execution time.


use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// Kind of mutation a [`DistroData`] represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataOperation {
    Add,
    Change,
    Delete,
    Verify,
    Snapshot,
}

impl DataOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataOperation::Add => "ADD",
            DataOperation::Change => "CHANGE",
            DataOperation::Delete => "DELETE",
            DataOperation::Verify => "VERIFY",
            DataOperation::Snapshot => "SNAPSHOT",
        }
    }
}

impl fmt::Display for DataOperation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a unit of replication.
///
/// Equality and hashing cover all three fields. Worker selection uses
/// [`DistroKey::dispatch_hash`] instead, which only looks at the resource key
/// so that copies of one entity bound for different peers share a lane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistroKey {
    resource_key: String,
    resource_type: String,
    target_server: String,
}

impl DistroKey {
    pub fn new(
        resource_key: impl Into<String>,
        resource_type: impl Into<String>,
        target_server: impl Into<String>,
    ) -> Self {
        Self {
            resource_key: resource_key.into(),
            resource_type: resource_type.into(),
            target_server: target_server.into(),
        }
    }

    /// Key without a destination, used before fan-out to peers
    pub fn local(
        resource_key: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self::new(resource_key, resource_type, "")
    }

    /// Copy of this key bound for `target_server`
    pub fn with_target(
        &self,
        target_server: impl Into<String>,
    ) -> Self {
        Self {
            resource_key: self.resource_key.clone(),
            resource_type: self.resource_type.clone(),
            target_server: target_server.into(),
        }
    }

    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn target_server(&self) -> &str {
        &self.target_server
    }

    /// Stable hash of the resource key.
    ///
    /// `DefaultHasher::new()` uses fixed keys, so the value does not change
    /// for the lifetime of the process.
    pub fn dispatch_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.resource_key.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for DistroKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "DistroKey{{type={}, key={}, target={}}}",
            self.resource_type, self.resource_key, self.target_server
        )
    }
}

/// Payload envelope shipped between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroData {
    distro_key: DistroKey,
    operation: DataOperation,
    content: Option<Bytes>,
}

impl DistroData {
    pub fn new(
        distro_key: DistroKey,
        content: Bytes,
    ) -> Self {
        Self {
            distro_key,
            operation: DataOperation::Change,
            content: Some(content),
        }
    }

    /// Deletion marker: key and operation only, no payload
    pub fn tombstone(distro_key: DistroKey) -> Self {
        Self {
            distro_key,
            operation: DataOperation::Delete,
            content: None,
        }
    }

    pub fn distro_key(&self) -> &DistroKey {
        &self.distro_key
    }

    pub fn operation(&self) -> DataOperation {
        self.operation
    }

    pub fn set_operation(
        &mut self,
        operation: DataOperation,
    ) {
        self.operation = operation;
    }

    pub fn with_operation(
        mut self,
        operation: DataOperation,
    ) -> Self {
        self.operation = operation;
        self
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn into_content(self) -> Option<Bytes> {
        self.content
    }

    pub fn resource_type(&self) -> &str {
        self.distro_key.resource_type()
    }
}
