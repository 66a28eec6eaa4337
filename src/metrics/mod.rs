#[cfg(test)]
mod metrics_test;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::register_histogram_vec;
use prometheus::register_int_counter_vec;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;

use crate::constants::RESULT_FAILED;
use crate::constants::RESULT_SUCCESS;
use crate::constants::RESULT_VERIFY_FAILED;
use crate::constants::RESULT_VERIFY_SUCCESS;

lazy_static! {
    pub static ref DISTRO_SYNC_TOTAL: IntCounterVec = register_int_counter_vec!(
        "distro_sync_total",
        "Outcomes of distro propagation per resource type",
        &["resource_type", "result"]
    )
    .expect("metric can not be created");

    pub static ref EXECUTE_TASK_DURATION_METRIC: HistogramVec = register_histogram_vec!(
        "distro_execute_task_duration_ms",
        "Histogram of task execution duration in ms per worker lane",
        &["worker"],
        exponential_buckets(1.0, 2.0, 14).expect("valid buckets")
    )
    .expect("metric can not be created");
}

pub(crate) fn record_sync_success(resource_type: &str) {
    DISTRO_SYNC_TOTAL.with_label_values(&[resource_type, RESULT_SUCCESS]).inc();
}

pub(crate) fn record_sync_failed(resource_type: &str) {
    DISTRO_SYNC_TOTAL.with_label_values(&[resource_type, RESULT_FAILED]).inc();
}

pub(crate) fn record_verify_success(resource_type: &str) {
    DISTRO_SYNC_TOTAL
        .with_label_values(&[resource_type, RESULT_VERIFY_SUCCESS])
        .inc();
}

pub(crate) fn record_verify_failed(resource_type: &str) {
    DISTRO_SYNC_TOTAL
        .with_label_values(&[resource_type, RESULT_VERIFY_FAILED])
        .inc();
}

pub(crate) fn observe_task_duration(
    worker: &str,
    millis: f64,
) {
    EXECUTE_TASK_DURATION_METRIC
        .with_label_values(&[worker])
        .observe(millis);
}
