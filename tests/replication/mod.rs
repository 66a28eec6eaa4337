use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use distro_engine::DataOperation;
use distro_engine::DistroKey;
use distro_engine::DistroProtocol;
use distro_engine::DistroSettings;
use distro_engine::LocalTransportAgent;
use distro_engine::MemoryDataStorage;
use distro_engine::StaticMembers;

use crate::common::wait_until;
use crate::common::PEER_ADDRESS;
use crate::common::SELF_ADDRESS;

fn settings_from_file() -> DistroSettings {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        r#"
[execute]
worker_count = 2
queue_capacity = 128

[delay]
process_interval_ms = 10

[sync]
sync_delay_ms = 30
sync_retry_delay_ms = 50
sync_timeout_ms = 2000
"#
    )
    .expect("write config");
    let path = file.path().to_str().expect("utf8 path").to_string();
    DistroSettings::load(Some(&path)).expect("settings should load")
}

/// Node A propagates a burst of changes and a delete to node B through the
/// in-process transport, completing on tokio's blocking pool.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replicates_to_peer_with_callback_transport() {
    let settings = settings_from_file();
    assert_eq!(settings.execute.queue_capacity, 128);
    assert_eq!(settings.sync.sync_timeout(), Duration::from_millis(2000));

    let members = StaticMembers::new(SELF_ADDRESS, vec![SELF_ADDRESS.to_string(), PEER_ADDRESS.to_string()]);
    let node_a = DistroProtocol::new(settings, Arc::new(members)).expect("protocol should start");

    let local = Arc::new(MemoryDataStorage::new("instance"));
    let peer = Arc::new(MemoryDataStorage::new("instance"));
    let agent = Arc::new(LocalTransportAgent::with_runtime(
        SELF_ADDRESS,
        tokio::runtime::Handle::current(),
        node_a.settings().sync.sync_timeout(),
    ));
    agent.register_peer(PEER_ADDRESS, peer.clone());

    let components = node_a.components();
    components.register_data_storage("instance", local.clone());
    components.register_transport_agent("instance", agent.clone());
    components.register_failed_task_handler("instance", node_a.retry_handler());

    let key = DistroKey::local("svc-a", "instance");
    for version in ["v1", "v2", "v3"] {
        local.put("svc-a", Bytes::from(version));
        node_a.sync(&key, DataOperation::Change);
    }

    let replicated = {
        let peer = peer.clone();
        tokio::task::spawn_blocking(move || {
            wait_until(Duration::from_secs(5), || {
                peer.get("svc-a") == Some(Bytes::from_static(b"v3"))
            })
        })
        .await
        .expect("wait task")
    };
    assert!(replicated);

    local.remove("svc-a");
    node_a.sync(&key, DataOperation::Delete);
    let deleted = {
        let peer = peer.clone();
        tokio::task::spawn_blocking(move || wait_until(Duration::from_secs(5), || peer.is_empty()))
            .await
            .expect("wait task")
    };
    assert!(deleted);

    let record = node_a.records().get_record("instance");
    let recorded = {
        let record = record.clone();
        tokio::task::spawn_blocking(move || wait_until(Duration::from_secs(5), || record.success_count() >= 2))
            .await
            .expect("wait task")
    };
    assert!(recorded);
    assert_eq!(record.failed_count(), 0);
    node_a.shutdown();
}
