//! Per resource-type success/failure counters.
//!
//! Counters are bumped from worker threads and from transport callback
//! threads, so every increment is atomic and readers never block writers.


use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;

use crate::metrics;

#[derive(Debug)]
pub struct DistroRecord {
    resource_type: String,
    success_count: AtomicU64,
    failed_count: AtomicU64,
    verify_success_count: AtomicU64,
    verify_failed_count: AtomicU64,
}

impl DistroRecord {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            success_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
            verify_success_count: AtomicU64::new(0),
            verify_failed_count: AtomicU64::new(0),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn sync_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        metrics::record_sync_success(&self.resource_type);
    }

    pub fn sync_fail(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
        metrics::record_sync_failed(&self.resource_type);
    }

    pub fn verify_success(&self) {
        self.verify_success_count.fetch_add(1, Ordering::Relaxed);
        metrics::record_verify_success(&self.resource_type);
    }

    pub fn verify_fail(&self) {
        self.verify_failed_count.fetch_add(1, Ordering::Relaxed);
        metrics::record_verify_failed(&self.resource_type);
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn verify_success_count(&self) -> u64 {
        self.verify_success_count.load(Ordering::Relaxed)
    }

    pub fn verify_failed_count(&self) -> u64 {
        self.verify_failed_count.load(Ordering::Relaxed)
    }

    pub fn total_sync_count(&self) -> u64 {
        self.success_count() + self.failed_count()
    }
}

/// Process-wide table of [`DistroRecord`]s, one per resource type.
///
/// Constructed once and shared by `Arc` with the tasks that need it.
#[derive(Debug, Default)]
pub struct DistroRecordsHolder {
    records: DashMap<String, Arc<DistroRecord>>,
}

impl DistroRecordsHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `resource_type`, created on first use
    pub fn get_record(
        &self,
        resource_type: &str,
    ) -> Arc<DistroRecord> {
        if let Some(record) = self.records.get(resource_type) {
            return record.value().clone();
        }
        self.records
            .entry(resource_type.to_string())
            .or_insert_with(|| Arc::new(DistroRecord::new(resource_type)))
            .value()
            .clone()
    }

    pub fn find_record(
        &self,
        resource_type: &str,
    ) -> Option<Arc<DistroRecord>> {
        self.records.get(resource_type).map(|r| r.value().clone())
    }

    pub fn total_success_count(&self) -> u64 {
        self.records.iter().map(|r| r.success_count()).sum()
    }

    pub fn total_failed_count(&self) -> u64 {
        self.records.iter().map(|r| r.failed_count()).sum()
    }

    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        types.sort();
        types
    }
}
