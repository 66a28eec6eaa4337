use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::unbounded;
use distro_engine::DataOperation;
use distro_engine::DistroComponentHolder;
use distro_engine::DistroKey;
use distro_engine::DistroRecordsHolder;
use distro_engine::DistroSyncTask;
use distro_engine::ExecuteEngineConfig;
use distro_engine::ExecuteTaskEngine;
use distro_engine::constants::RESOURCE_TYPE_INSTANCE;

use crate::common::FixedPayloadStorage;
use crate::common::RecordingTransport;
use crate::common::PEER_ADDRESS;

/// Change task for `instance/svc-a` dispatched through the execute engine
/// ships exactly one CHANGE with the stored payload.
#[test]
fn test_change_task_scenario() {
    let components = Arc::new(DistroComponentHolder::new());
    let records = Arc::new(DistroRecordsHolder::new());
    let (calls_tx, calls_rx) = unbounded();

    components.register_data_storage(
        RESOURCE_TYPE_INSTANCE,
        Arc::new(FixedPayloadStorage {
            resource_key: "svc-a".to_string(),
            payload: Bytes::from_static(b"fixed-payload"),
        }),
    );
    components.register_transport_agent(RESOURCE_TYPE_INSTANCE, Arc::new(RecordingTransport { calls: calls_tx }));

    let engine = ExecuteTaskEngine::new(
        "scenario",
        &ExecuteEngineConfig {
            worker_count: 4,
            ..Default::default()
        },
    )
    .expect("engine should start");

    let key = DistroKey::new("svc-a", RESOURCE_TYPE_INSTANCE, PEER_ADDRESS);
    let task = DistroSyncTask::change(key.clone(), components, records.clone());
    engine.dispatch(&key, Box::new(task)).expect("dispatch");

    let (data, target) = calls_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("transport should be called");
    assert_eq!(target, PEER_ADDRESS);
    assert_eq!(data.distro_key(), &key);
    assert_eq!(data.operation(), DataOperation::Change);
    assert_eq!(data.content(), Some(&Bytes::from_static(b"fixed-payload")));

    // joins the lane, so the outcome is recorded by now
    engine.shutdown();
    assert!(calls_rx.try_recv().is_err());
    assert_eq!(records.get_record(RESOURCE_TYPE_INSTANCE).success_count(), 1);
    assert_eq!(records.get_record(RESOURCE_TYPE_INSTANCE).failed_count(), 0);
}
