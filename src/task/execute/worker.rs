use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::bounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::panic_message;
use super::ExecuteTask;
use crate::metrics;
use crate::ExecuteError;
use crate::Result;

pub(crate) type BoxedTask = Box<dyn ExecuteTask>;

/// One execution lane: a bounded FIFO queue drained by a dedicated thread.
pub(crate) struct TaskExecuteWorker {
    name: String,
    sender: Sender<BoxedTask>,
    /// Kept to clear the queue on shutdown
    receiver: Receiver<BoxedTask>,
    closed: Arc<AtomicBool>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskExecuteWorker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TaskExecuteWorker")
            .field("name", &self.name)
            .field("pending", &self.pending_task_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl TaskExecuteWorker {
    pub(crate) fn new(
        name: String,
        queue_capacity: usize,
        slow_task_threshold: Duration,
    ) -> Result<Self> {
        let (sender, receiver) = bounded::<BoxedTask>(queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let closed = Arc::new(AtomicBool::new(false));

        let handle = {
            let worker_name = name.clone();
            let receiver = receiver.clone();
            let closed = closed.clone();
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || Self::run_loop(worker_name, receiver, shutdown_rx, closed, slow_task_threshold))
                .map_err(|source| ExecuteError::WorkerSpawn {
                    name: name.clone(),
                    source,
                })?
        };

        Ok(Self {
            name,
            sender,
            receiver,
            closed,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            thread_handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue `task`, blocking while the queue is full
    pub(crate) fn process(
        &self,
        task: BoxedTask,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(ExecuteError::EngineShutdown.into());
        }
        self.sender
            .send(task)
            .map_err(|_| ExecuteError::EngineShutdown)?;

        // Shutdown may have cleared the queue while we were blocked on a full lane
        if self.is_closed() {
            self.clear();
            return Err(ExecuteError::EngineShutdown.into());
        }
        Ok(())
    }

    pub(crate) fn pending_task_count(&self) -> usize {
        self.sender.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn status(&self) -> String {
        format!("{}, pending tasks: {}", self.name(), self.pending_task_count())
    }

    /// Stop accepting tasks, clear the queue and wait for the lane thread.
    ///
    /// Safe to call repeatedly. A task already running is allowed to finish.
    pub(crate) fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let dropped = self.clear();
        if dropped > 0 {
            warn!(worker = %self.name, dropped, "discarded pending tasks on shutdown");
        }

        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.thread_handle.lock().take() {
            // A task shutting down its own engine must not join itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        debug!(worker = %self.name, "worker stopped");
    }

    fn clear(&self) -> usize {
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    fn run_loop(
        name: String,
        receiver: Receiver<BoxedTask>,
        shutdown_rx: Receiver<()>,
        closed: Arc<AtomicBool>,
        slow_task_threshold: Duration,
    ) {
        debug!(worker = %name, "worker thread started");

        loop {
            crossbeam_channel::select! {
                recv(receiver) -> result => {
                    match result {
                        Ok(task) => {
                            if closed.load(Ordering::Acquire) {
                                trace!(worker = %name, "abandon task dequeued after shutdown");
                                break;
                            }
                            Self::execute(&name, task, slow_task_threshold);
                        }
                        Err(_) => {
                            warn!(worker = %name, "task channel closed unexpectedly");
                            break;
                        }
                    }
                }
                recv(shutdown_rx) -> _ => {
                    debug!(worker = %name, "worker received shutdown signal");
                    break;
                }
            }
        }

        debug!(worker = %name, "worker thread exited");
    }

    /// Runs one task. Errors and panics stop here so the lane keeps going.
    pub(crate) fn execute(
        worker: &str,
        task: BoxedTask,
        slow_task_threshold: Duration,
    ) {
        let description = task.describe();
        let start = Instant::now();

        match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(worker, task = %description, "task execution failed: {:?}", e);
            }
            Err(payload) => {
                let e = ExecuteError::TaskPanicked {
                    worker: worker.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                error!(worker, task = %description, "{}", e);
            }
        }

        let elapsed = start.elapsed();
        metrics::observe_task_duration(worker, elapsed.as_secs_f64() * 1000.0);
        if elapsed > slow_task_threshold {
            warn!(
                worker,
                task = %description,
                "task took {} ms, longer than {} ms",
                elapsed.as_millis(),
                slow_task_threshold.as_millis()
            );
        }
    }
}

impl Drop for TaskExecuteWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
