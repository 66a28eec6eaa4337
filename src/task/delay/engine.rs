use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::bounded;
use crossbeam_channel::tick;
use crossbeam_channel::Sender;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::DelayTaskProcessor;
use super::DistroDelayTask;
use crate::constants::DELAY_ENGINE_THREAD_NAME;
use crate::DelayEngineConfig;
use crate::DistroKey;
use crate::ExecuteError;
use crate::Result;

struct DelayEngineInner {
    tasks: DashMap<DistroKey, DistroDelayTask>,
    processor: Arc<dyn DelayTaskProcessor>,
    closed: AtomicBool,
}

impl DelayEngineInner {
    fn process_tasks(&self) {
        let now = Instant::now();
        let keys: Vec<DistroKey> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if self.closed.load(Ordering::Acquire) {
                return;
            }
            let Some((key, mut task)) = self.tasks.remove_if(&key, |_, t| t.should_process(now)) else {
                continue;
            };
            trace!("process delay task {} {}", task.action(), key);
            if !self.processor.process(&task) {
                debug!("delay task {} {} failed, put back", task.action(), key);
                task.reset_process_time();
                self.put_back(key, task);
            }
        }
    }

    /// Insert unless a task for the key is already pending; the pending one
    /// is newer and supersedes the task being put back.
    fn put_back(
        &self,
        key: DistroKey,
        task: DistroDelayTask,
    ) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.tasks.entry(key).or_insert(task);
    }
}

/// Keyed store of pending [`DistroDelayTask`]s drained by a ticker thread.
pub struct DistroDelayTaskEngine {
    inner: Arc<DelayEngineInner>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DistroDelayTaskEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DistroDelayTaskEngine")
            .field("pending", &self.pending_task_count())
            .field("closed", &self.is_shutdown())
            .finish()
    }
}

impl DistroDelayTaskEngine {
    pub fn new(
        config: &DelayEngineConfig,
        processor: Arc<dyn DelayTaskProcessor>,
    ) -> Result<Self> {
        config.validate()?;
        let inner = Arc::new(DelayEngineInner {
            tasks: DashMap::new(),
            processor,
            closed: AtomicBool::new(false),
        });

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let interval = config.process_interval();
        let handle = {
            let inner = inner.clone();
            thread::Builder::new()
                .name(DELAY_ENGINE_THREAD_NAME.to_string())
                .spawn(move || {
                    debug!("delay engine thread started");
                    let ticker = tick(interval);
                    loop {
                        crossbeam_channel::select! {
                            recv(ticker) -> _ => inner.process_tasks(),
                            recv(shutdown_rx) -> _ => {
                                debug!("delay engine received shutdown signal");
                                break;
                            }
                        }
                    }
                    debug!("delay engine thread stopped");
                })
                .map_err(|source| ExecuteError::WorkerSpawn {
                    name: DELAY_ENGINE_THREAD_NAME.to_string(),
                    source,
                })?
        };

        Ok(Self {
            inner,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            thread_handle: Mutex::new(Some(handle)),
        })
    }

    /// Park `task`, merging with a pending task for the same key
    pub fn add_task(
        &self,
        task: DistroDelayTask,
    ) {
        if self.is_shutdown() {
            debug!("delay engine shut down, drop task {} {}", task.action(), task.distro_key());
            return;
        }
        match self.inner.tasks.entry(task.distro_key().clone()) {
            Entry::Occupied(mut pending) => {
                let mut task = task;
                task.merge(pending.get());
                pending.insert(task);
            }
            Entry::Vacant(slot) => {
                slot.insert(task);
            }
        }
    }

    /// Park `task` only if nothing is pending for its key.
    ///
    /// Used for resubmissions: a pending task was created later than the
    /// failed one and already covers it.
    pub fn add_task_if_absent(
        &self,
        task: DistroDelayTask,
    ) {
        self.inner.put_back(task.distro_key().clone(), task);
    }

    pub fn remove_task(
        &self,
        distro_key: &DistroKey,
    ) -> Option<DistroDelayTask> {
        self.inner.tasks.remove(distro_key).map(|(_, t)| t)
    }

    pub fn pending_task_count(&self) -> usize {
        self.inner.tasks.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Idempotent stop; pending tasks are discarded
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        let dropped = self.inner.tasks.len();
        self.inner.tasks.clear();
        info!(dropped, "delay engine stopped");
    }
}

impl Drop for DistroDelayTaskEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
