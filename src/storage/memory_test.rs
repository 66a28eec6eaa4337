use bytes::Bytes;
use tracing_test::traced_test;

use super::memory::digest;
use super::*;
use crate::constants::SNAPSHOT_RESOURCE_KEY;
use crate::DataOperation;
use crate::DistroData;
use crate::DistroDataProcessor;
use crate::DistroDataStorage;
use crate::DistroKey;

fn key(name: &str) -> DistroKey {
    DistroKey::new(name, "instance", "10.0.0.2:8848")
}

#[test]
fn test_get_distro_data_keeps_requested_key() {
    let storage = MemoryDataStorage::new("instance");
    storage.put("svc-a", Bytes::from_static(b"v1"));

    let data = storage.get_distro_data(&key("svc-a")).expect("data");
    assert_eq!(data.distro_key(), &key("svc-a"));
    assert_eq!(data.operation(), DataOperation::Change);
    assert_eq!(data.content(), Some(&Bytes::from_static(b"v1")));
    assert!(storage.get_distro_data(&key("svc-b")).is_none());
}

#[test]
fn test_process_data_applies_change_and_delete() {
    let storage = MemoryDataStorage::new("instance");

    assert!(storage.process_data(DistroData::new(key("svc-a"), Bytes::from_static(b"v1"))));
    assert!(storage.process_data(
        DistroData::new(key("svc-b"), Bytes::from_static(b"v1")).with_operation(DataOperation::Add)
    ));
    assert_eq!(storage.keys(), vec!["svc-a".to_string(), "svc-b".to_string()]);

    assert!(storage.process_data(DistroData::tombstone(key("svc-a"))));
    assert_eq!(storage.get("svc-a"), None);
    // deleting an unknown key is still applied
    assert!(storage.process_data(DistroData::tombstone(key("svc-z"))));
    assert_eq!(storage.len(), 1);
}

#[test]
#[traced_test]
fn test_process_data_rejects_foreign_resource_type() {
    let storage = MemoryDataStorage::new("instance");
    let foreign = DistroKey::new("svc-a", "service-metadata", "10.0.0.2:8848");

    assert!(!storage.process_data(DistroData::new(foreign, Bytes::from_static(b"v1"))));
    assert!(storage.is_empty());
    assert!(logs_contain("data of another resource type"));
}

#[test]
fn test_snapshot_loads_into_empty_storage() {
    let source = MemoryDataStorage::new("instance");
    source.put("svc-a", Bytes::from_static(b"a"));
    source.put("svc-b", Bytes::from_static(b"b"));

    let snapshot = source.get_datum_snapshot().expect("snapshot");
    assert_eq!(snapshot.operation(), DataOperation::Snapshot);
    assert_eq!(snapshot.resource_type(), "instance");
    assert_eq!(snapshot.distro_key().resource_key(), SNAPSHOT_RESOURCE_KEY);
    assert_eq!(snapshot.distro_key().target_server(), "");

    let sink = MemoryDataStorage::new("instance");
    assert!(sink.process_snapshot(snapshot));
    assert_eq!(sink.keys(), source.keys());
    assert_eq!(sink.get("svc-b"), Some(Bytes::from_static(b"b")));
}

#[test]
fn test_snapshot_with_garbage_is_rejected() {
    let storage = MemoryDataStorage::new("instance");
    let garbage = DistroData::new(DistroKey::local("instance", "instance"), Bytes::from_static(&[0xff; 3]))
        .with_operation(DataOperation::Snapshot);
    assert!(!storage.process_snapshot(garbage));

    let empty = DistroData::tombstone(DistroKey::local("instance", "instance")).with_operation(DataOperation::Snapshot);
    assert!(!storage.process_snapshot(empty));
    assert!(storage.is_empty());
}

#[test]
fn test_verify_data_matches_digest() {
    let storage = MemoryDataStorage::new("instance");
    storage.put("svc-a", Bytes::from_static(b"v1"));

    let verify = storage.get_verify_data();
    assert_eq!(verify.len(), 1);
    assert_eq!(verify[0].operation(), DataOperation::Verify);
    assert_eq!(verify[0].content(), Some(&digest(b"v1")));

    let peer = MemoryDataStorage::new("instance");
    assert!(!peer.process_verify_data(verify[0].clone(), "10.0.0.1:8848"));
    peer.put("svc-a", Bytes::from_static(b"stale"));
    assert!(!peer.process_verify_data(verify[0].clone(), "10.0.0.1:8848"));
    peer.put("svc-a", Bytes::from_static(b"v1"));
    assert!(peer.process_verify_data(verify[0].clone(), "10.0.0.1:8848"));
}
