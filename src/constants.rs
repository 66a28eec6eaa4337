// -
// Resource types

/// Ephemeral instances owned by a client connection
pub const RESOURCE_TYPE_INSTANCE: &str = "instance";

/// Service level metadata
pub const RESOURCE_TYPE_SERVICE_METADATA: &str = "service-metadata";

// -
// Execute engine

/// Default bounded capacity of one worker lane
pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 50_000;

/// Execution time above which a task is reported as slow
pub(crate) const DEFAULT_SLOW_TASK_THRESHOLD_MS: u64 = 1_000;

/// Worker thread name prefix
pub(crate) const WORKER_NAME_PREFIX: &str = "distro-execute-worker";

/// Delay engine ticker thread name
pub(crate) const DELAY_ENGINE_THREAD_NAME: &str = "distro-delay-engine";

/// Startup snapshot load thread name
pub(crate) const LOAD_DATA_THREAD_NAME: &str = "distro-load-data";

// -
// Snapshots

/// Resource key carried by a whole-type snapshot
pub const SNAPSHOT_RESOURCE_KEY: &str = "snapshot";

// -
// Metric labels

pub(crate) const RESULT_SUCCESS: &str = "success";
pub(crate) const RESULT_FAILED: &str = "failed";
pub(crate) const RESULT_VERIFY_SUCCESS: &str = "verify_success";
pub(crate) const RESULT_VERIFY_FAILED: &str = "verify_failed";
