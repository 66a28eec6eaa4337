use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tracing::info;

use super::worker::TaskExecuteWorker;
use super::DispatchKey;
use super::ExecuteTask;
use crate::constants::WORKER_NAME_PREFIX;
use crate::ExecuteEngineConfig;
use crate::ExecuteError;
use crate::Result;

/// Fixed set of FIFO worker lanes selected by key hash.
///
/// # Ordering
/// Tasks whose keys hash to the same lane run strictly in enqueue order.
/// Nothing is guaranteed across lanes.
///
/// # Backpressure
/// [`ExecuteTaskEngine::dispatch`] blocks the caller while the selected lane
/// is full. This is not an error.
#[derive(Debug)]
pub struct ExecuteTaskEngine {
    name: String,
    workers: Vec<TaskExecuteWorker>,
    /// Round-robin cursor for key-less `execute`
    next_worker: AtomicUsize,
    closed: AtomicBool,
}

impl ExecuteTaskEngine {
    pub fn new(
        name: &str,
        config: &ExecuteEngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let worker_count = config.effective_worker_count();
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            workers.push(TaskExecuteWorker::new(
                format!("{WORKER_NAME_PREFIX}-{name}-{index}"),
                config.queue_capacity,
                config.slow_task_threshold(),
            )?);
        }
        info!(engine = name, worker_count, queue_capacity = config.queue_capacity, "execute engine started");

        Ok(Self {
            name: name.to_string(),
            workers,
            next_worker: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Route `task` to the lane selected by `key.dispatch_hash()`
    pub fn dispatch<K>(
        &self,
        key: &K,
        task: Box<dyn ExecuteTask>,
    ) -> Result<()>
    where
        K: DispatchKey + ?Sized,
    {
        self.dispatch_by_hash(key.dispatch_hash(), task)
    }

    /// Route `task` to the lane selected by a precomputed hash
    pub fn dispatch_by_hash(
        &self,
        hash: u64,
        task: Box<dyn ExecuteTask>,
    ) -> Result<()> {
        if self.is_shutdown() {
            return Err(ExecuteError::EngineShutdown.into());
        }
        let index = self.worker_index(hash);
        self.workers[index].process(task)
    }

    /// Submit a task with no ordering requirement
    pub fn execute(
        &self,
        task: Box<dyn ExecuteTask>,
    ) -> Result<()> {
        if self.is_shutdown() {
            return Err(ExecuteError::EngineShutdown.into());
        }
        let index = self.next_worker.fetch_add(1, Ordering::Relaxed) & (self.workers.len() - 1);
        self.workers[index].process(task)
    }

    /// Lane index for `hash`. The lane count is a power of two, so masking
    /// keeps the index non-negative and in range.
    pub fn worker_index(
        &self,
        hash: u64,
    ) -> usize {
        (hash as usize) & (self.workers.len() - 1)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn pending_task_count(&self) -> usize {
        self.workers.iter().map(|w| w.pending_task_count()).sum()
    }

    /// Queue depth per lane, one line each
    pub fn workers_status(&self) -> String {
        let mut status = String::new();
        for worker in &self.workers {
            status.push_str(&worker.status());
            status.push('\n');
        }
        status
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent graceful stop
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker in &self.workers {
            worker.shutdown();
        }
        info!(engine = %self.name, "execute engine stopped");
    }

    #[cfg(test)]
    pub(crate) fn worker_names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name().to_string()).collect()
    }
}
