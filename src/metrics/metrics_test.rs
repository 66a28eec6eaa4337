use super::*;

#[test]
fn test_sync_counters_per_result_label() {
    // label unique to this test, the collectors are process-wide
    let resource_type = "metrics-test-sync";

    record_sync_success(resource_type);
    record_sync_success(resource_type);
    record_sync_failed(resource_type);
    record_verify_failed(resource_type);

    let count = |result: &str| DISTRO_SYNC_TOTAL.with_label_values(&[resource_type, result]).get();
    assert_eq!(count(RESULT_SUCCESS), 2);
    assert_eq!(count(RESULT_FAILED), 1);
    assert_eq!(count(RESULT_VERIFY_SUCCESS), 0);
    assert_eq!(count(RESULT_VERIFY_FAILED), 1);
}

#[test]
fn test_task_duration_histogram() {
    let worker = "metrics-test-worker";
    observe_task_duration(worker, 3.0);
    observe_task_duration(worker, 1500.0);

    let histogram = EXECUTE_TASK_DURATION_METRIC.with_label_values(&[worker]);
    assert_eq!(histogram.get_sample_count(), 2);
    assert_eq!(histogram.get_sample_sum(), 1503.0);
}

#[test]
fn test_collectors_are_registered() {
    record_sync_success("metrics-test-registry");
    let names: Vec<String> = prometheus::gather()
        .iter()
        .map(|family| family.get_name().to_string())
        .collect();
    assert!(names.contains(&"distro_sync_total".to_string()));
}
