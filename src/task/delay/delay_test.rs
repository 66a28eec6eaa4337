use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;

use super::*;
use crate::DataOperation;
use crate::DelayEngineConfig;
use crate::DistroComponentHolder;
use crate::DistroKey;
use crate::DistroRecordsHolder;
use crate::ExecuteEngineConfig;
use crate::ExecuteTaskEngine;
use crate::MockDistroTransportAgent;

fn key(name: &str) -> DistroKey {
    DistroKey::new(name, "instance", "10.0.0.2:8848")
}

fn fast_config() -> DelayEngineConfig {
    DelayEngineConfig {
        process_interval_ms: 10,
    }
}

#[test]
fn test_merge_keeps_newest_action_and_earliest_time() {
    let older = DistroDelayTask::new(key("svc-a"), DataOperation::Change, Duration::from_millis(100));
    std::thread::sleep(Duration::from_millis(20));
    let mut newer = DistroDelayTask::new(key("svc-a"), DataOperation::Delete, Duration::from_millis(100));

    let before = Instant::now();
    assert!(!newer.should_process(before + Duration::from_millis(85)));
    newer.merge(&older);

    assert_eq!(newer.action(), DataOperation::Delete);
    // inherits the older start time, so it is due sooner
    assert!(newer.should_process(before + Duration::from_millis(85)));
}

#[test]
fn test_should_process_waits_for_delay() {
    let task = DistroDelayTask::new(key("svc-a"), DataOperation::Change, Duration::from_secs(60));
    assert!(!task.should_process(Instant::now()));
    assert!(task.should_process(Instant::now() + Duration::from_secs(61)));
}

#[test]
fn test_burst_collapses_into_one_process_call() {
    let (processed_tx, processed_rx) = unbounded();
    let mut processor = MockDelayTaskProcessor::new();
    processor.expect_process().returning(move |task| {
        processed_tx.send((task.distro_key().clone(), task.action())).expect("signal");
        true
    });
    let engine = DistroDelayTaskEngine::new(&fast_config(), Arc::new(processor)).expect("engine should start");

    for op in [DataOperation::Change, DataOperation::Change, DataOperation::Delete] {
        engine.add_task(DistroDelayTask::new(key("svc-a"), op, Duration::from_millis(100)));
    }
    assert_eq!(engine.pending_task_count(), 1);

    let processed = processed_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("task should be processed");
    assert_eq!(processed, (key("svc-a"), DataOperation::Delete));
    assert!(processed_rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(engine.pending_task_count(), 0);
    engine.shutdown();
}

#[test]
fn test_distinct_targets_are_separate_tasks() {
    let processor = Arc::new(MockDelayTaskProcessor::new());
    let engine = DistroDelayTaskEngine::new(&fast_config(), processor).expect("engine should start");

    let delay = Duration::from_secs(60);
    engine.add_task(DistroDelayTask::new(key("svc-a"), DataOperation::Change, delay));
    engine.add_task(DistroDelayTask::new(
        DistroKey::new("svc-a", "instance", "10.0.0.3:8848"),
        DataOperation::Change,
        delay,
    ));
    assert_eq!(engine.pending_task_count(), 2);
    assert!(engine.remove_task(&key("svc-a")).is_some());
    assert_eq!(engine.pending_task_count(), 1);
    engine.shutdown();
}

#[test]
fn test_failed_processing_puts_task_back() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = bounded(1);
    let mut processor = MockDelayTaskProcessor::new();
    {
        let attempts = attempts.clone();
        processor.expect_process().returning(move |_| {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                return false;
            }
            let _ = done_tx.try_send(());
            true
        });
    }
    let engine = DistroDelayTaskEngine::new(&fast_config(), Arc::new(processor)).expect("engine should start");
    engine.add_task(DistroDelayTask::new(key("svc-a"), DataOperation::Change, Duration::from_millis(20)));

    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("task should eventually succeed");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    engine.shutdown();
}

#[test]
fn test_add_if_absent_does_not_override_pending_task() {
    let engine = DistroDelayTaskEngine::new(&fast_config(), Arc::new(MockDelayTaskProcessor::new()))
        .expect("engine should start");
    let delay = Duration::from_secs(60);

    engine.add_task(DistroDelayTask::new(key("svc-a"), DataOperation::Delete, delay));
    engine.add_task_if_absent(DistroDelayTask::new(key("svc-a"), DataOperation::Change, delay));
    let pending = engine.remove_task(&key("svc-a")).expect("pending task");
    assert_eq!(pending.action(), DataOperation::Delete);

    engine.add_task_if_absent(DistroDelayTask::new(key("svc-b"), DataOperation::Change, delay));
    assert_eq!(engine.pending_task_count(), 1);
    engine.shutdown();
}

#[test]
fn test_shutdown_discards_pending_and_is_idempotent() {
    let mut processor = MockDelayTaskProcessor::new();
    processor.expect_process().never();
    let engine = DistroDelayTaskEngine::new(&fast_config(), Arc::new(processor)).expect("engine should start");
    engine.add_task(DistroDelayTask::new(key("svc-a"), DataOperation::Change, Duration::from_secs(60)));

    engine.shutdown();
    engine.shutdown();
    assert!(engine.is_shutdown());
    assert_eq!(engine.pending_task_count(), 0);

    engine.add_task(DistroDelayTask::new(key("svc-a"), DataOperation::Change, Duration::ZERO));
    assert_eq!(engine.pending_task_count(), 0);
}

#[test]
fn test_processor_dispatches_sync_task_to_execute_engine() {
    let components = Arc::new(DistroComponentHolder::new());
    let records = Arc::new(DistroRecordsHolder::new());
    let (synced_tx, synced_rx) = bounded(1);
    let mut agent = MockDistroTransportAgent::new();
    agent.expect_support_callback_transport().returning(|| false);
    agent.expect_sync_data().times(1).returning(move |data, target| {
        synced_tx
            .send((data.operation(), target.to_string()))
            .expect("signal");
        Ok(true)
    });
    components.register_transport_agent("instance", Arc::new(agent));

    let execute_engine = Arc::new(
        ExecuteTaskEngine::new(
            "delay-test",
            &ExecuteEngineConfig {
                worker_count: 2,
                ..Default::default()
            },
        )
        .expect("engine should start"),
    );
    let processor = DistroDelayTaskProcessor::new(execute_engine.clone(), components, records.clone());

    let task = DistroDelayTask::new(key("svc-a"), DataOperation::Delete, Duration::ZERO);
    assert!(processor.process(&task));
    let synced = synced_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("sync task should run");
    assert_eq!(synced, (DataOperation::Delete, "10.0.0.2:8848".to_string()));

    // not propagated through sync tasks
    let verify = DistroDelayTask::new(key("svc-a"), DataOperation::Verify, Duration::ZERO);
    assert!(processor.process(&verify));

    execute_engine.shutdown();
    let task = DistroDelayTask::new(key("svc-a"), DataOperation::Change, Duration::ZERO);
    assert!(!processor.process(&task));
}
