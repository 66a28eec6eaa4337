//! Entry point of the replication core.
//!
//! [`DistroProtocol`] owns the records, the component registry and both
//! engines, and wires them together without any global state:
//!
//! ```text
//! sync(key, op)
//!     │ one delay task per peer
//!     ▼
//! DistroDelayTaskEngine ──(delay elapsed, merged)──► DistroDelayTaskProcessor
//!                                                         │ dispatch by resource_key
//!                                                         ▼
//!                                                  ExecuteTaskEngine lanes
//!                                                         │ DistroSyncTask
//!                                                         ▼
//!                                               DistroTransportAgent ──► peer
//!                                                         │ failure
//!                                                         ▼
//!                                               DistroFailedTaskHandler (retry)
//! ```
//!
//! At startup [`DistroProtocol::start_load_task`] pulls a snapshot of every
//! resource type from the peers; [`DistroProtocol::is_initialized`] turns
//! `true` once all of them are loaded.

mod load;


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::bounded;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use self::load::SnapshotLoader;
use crate::constants::LOAD_DATA_THREAD_NAME;
use crate::ClusterMembers;
use crate::DataOperation;
use crate::DelayedRetryHandler;
use crate::DistroComponentHolder;
use crate::DistroData;
use crate::DistroDelayTask;
use crate::DistroDelayTaskEngine;
use crate::DistroDelayTaskProcessor;
use crate::DistroKey;
use crate::DistroRecordsHolder;
use crate::DistroSettings;
use crate::ExecuteError;
use crate::ExecuteTaskEngine;
use crate::Result;

const EXECUTE_ENGINE_NAME: &str = "distro";

pub struct DistroProtocol {
    settings: DistroSettings,
    members: Arc<dyn ClusterMembers>,
    components: Arc<DistroComponentHolder>,
    records: Arc<DistroRecordsHolder>,
    execute_engine: Arc<ExecuteTaskEngine>,
    delay_engine: Arc<DistroDelayTaskEngine>,
    retry_handler: Arc<DelayedRetryHandler>,
    loader: Arc<SnapshotLoader>,
    /// Shutdown signal and handle of the background load thread
    load_task: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DistroProtocol {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DistroProtocol")
            .field("components", &self.components)
            .field("execute_engine", &self.execute_engine)
            .field("delay_engine", &self.delay_engine)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl DistroProtocol {
    pub fn new(
        settings: DistroSettings,
        members: Arc<dyn ClusterMembers>,
    ) -> Result<Self> {
        settings.validate()?;
        let components = Arc::new(DistroComponentHolder::new());
        let records = Arc::new(DistroRecordsHolder::new());
        let execute_engine = Arc::new(ExecuteTaskEngine::new(EXECUTE_ENGINE_NAME, &settings.execute)?);

        let processor = Arc::new(DistroDelayTaskProcessor::new(
            execute_engine.clone(),
            components.clone(),
            records.clone(),
        ));
        let delay_engine = match DistroDelayTaskEngine::new(&settings.delay, processor) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                execute_engine.shutdown();
                return Err(e);
            }
        };
        let retry_handler = Arc::new(DelayedRetryHandler::new(
            Arc::downgrade(&delay_engine),
            settings.sync.sync_retry_delay(),
        ));

        let loader = Arc::new(SnapshotLoader::new(members.clone(), components.clone()));

        info!(
            self_address = %members.self_address(),
            workers = execute_engine.worker_count(),
            "distro protocol started"
        );
        Ok(Self {
            settings,
            members,
            components,
            records,
            execute_engine,
            delay_engine,
            retry_handler,
            loader,
            load_task: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &DistroSettings {
        &self.settings
    }

    /// Registry to bind storages, transport agents, retry handlers and
    /// processors per resource type
    pub fn components(&self) -> &Arc<DistroComponentHolder> {
        &self.components
    }

    pub fn records(&self) -> &Arc<DistroRecordsHolder> {
        &self.records
    }

    pub fn execute_engine(&self) -> &Arc<ExecuteTaskEngine> {
        &self.execute_engine
    }

    pub fn delay_engine(&self) -> &Arc<DistroDelayTaskEngine> {
        &self.delay_engine
    }

    /// Default retry policy bound to this protocol's delay engine. Register
    /// it with [`DistroComponentHolder::register_failed_task_handler`].
    pub fn retry_handler(&self) -> Arc<DelayedRetryHandler> {
        self.retry_handler.clone()
    }

    /// Propagate a local mutation to every peer after the configured sync delay
    pub fn sync(
        &self,
        distro_key: &DistroKey,
        action: DataOperation,
    ) {
        self.sync_with_delay(distro_key, action, self.settings.sync.sync_delay());
    }

    pub fn sync_with_delay(
        &self,
        distro_key: &DistroKey,
        action: DataOperation,
        delay: Duration,
    ) {
        for peer in self.members.peers() {
            self.sync_to_target(&distro_key.with_target(peer), action, delay);
        }
    }

    /// `distro_key` must carry its target server
    pub fn sync_to_target(
        &self,
        distro_key: &DistroKey,
        action: DataOperation,
        delay: Duration,
    ) {
        if self.is_shutdown() {
            debug!("protocol shut down, drop sync {} {}", action, distro_key);
            return;
        }
        debug!("[DISTRO-SCHEDULE] {} {} in {} ms", action, distro_key, delay.as_millis());
        self.delay_engine
            .add_task(DistroDelayTask::new(distro_key.clone(), action, delay));
    }

    /// Apply data received from a peer
    pub fn on_receive(
        &self,
        data: DistroData,
    ) -> bool {
        let resource_type = data.resource_type().to_string();
        debug!(
            "[DISTRO] receive distro data type: {}, key: {}",
            resource_type,
            data.distro_key()
        );
        let Some(processor) = self.components.find_data_processor(&resource_type) else {
            warn!(%resource_type, "no data processor registered, drop received data");
            return false;
        };
        processor.process_data(data)
    }

    /// Check a peer's verify data against local state
    pub fn on_verify(
        &self,
        verify_data: DistroData,
        source_address: &str,
    ) -> bool {
        let resource_type = verify_data.resource_type().to_string();
        let Some(processor) = self.components.find_data_processor(&resource_type) else {
            warn!(%resource_type, "no data processor registered, drop verify data");
            return false;
        };
        let record = self.records.get_record(&resource_type);
        if processor.process_verify_data(verify_data, source_address) {
            record.verify_success();
            true
        } else {
            record.verify_fail();
            false
        }
    }

    pub fn on_snapshot(
        &self,
        snapshot: DistroData,
    ) -> bool {
        let resource_type = snapshot.resource_type().to_string();
        let Some(processor) = self.components.find_data_processor(&resource_type) else {
            warn!(%resource_type, "no data processor registered, drop snapshot");
            return false;
        };
        processor.process_snapshot(snapshot)
    }

    /// Pull one entity from the peer named by `distro_key`
    pub fn query(
        &self,
        distro_key: &DistroKey,
    ) -> Option<DistroData> {
        if distro_key.target_server().is_empty() {
            warn!("can't query {} from an empty target server", distro_key);
            return None;
        }
        let Some(agent) = self.components.find_transport_agent(distro_key.resource_type()) else {
            warn!(
                resource_type = distro_key.resource_type(),
                "no transport agent registered, can't query {}", distro_key
            );
            return None;
        };
        match agent.get_data(distro_key, distro_key.target_server()) {
            Ok(data) => data,
            Err(e) => {
                warn!("query {} failed: {}", distro_key, e);
                None
            }
        }
    }

    /// `true` once a snapshot of every registered resource type has been
    /// loaded from a peer, or right away without peers
    pub fn is_initialized(&self) -> bool {
        self.loader.is_initialized()
    }

    /// One load round on the calling thread: for each resource type not yet
    /// loaded, pull snapshots from the peers until one applies.
    ///
    /// # Returns
    /// `true` once every resource type is loaded
    pub fn load_snapshot(&self) -> bool {
        self.loader.load_all()
    }

    /// Load in the background, retrying every `sync.load_retry_delay_ms`
    /// until [`DistroProtocol::is_initialized`]. Register components first.
    /// Calling it again while a load task exists does nothing.
    pub fn start_load_task(&self) -> Result<()> {
        let mut load_task = self.load_task.lock();
        if self.is_shutdown() {
            return Err(ExecuteError::EngineShutdown.into());
        }
        if load_task.is_some() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let loader = self.loader.clone();
        let retry_delay = self.settings.sync.load_retry_delay();
        let handle = thread::Builder::new()
            .name(LOAD_DATA_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("load data thread started");
                while !loader.load_all() {
                    debug!("[DISTRO-INIT] snapshot load incomplete, retry in {} ms", retry_delay.as_millis());
                    if !matches!(shutdown_rx.recv_timeout(retry_delay), Err(RecvTimeoutError::Timeout)) {
                        debug!("load data thread received shutdown signal");
                        break;
                    }
                }
                debug!("load data thread stopped");
            })
            .map_err(|source| ExecuteError::WorkerSpawn {
                name: LOAD_DATA_THREAD_NAME.to_string(),
                source,
            })?;

        *load_task = Some((shutdown_tx, handle));
        Ok(())
    }

    pub fn workers_status(&self) -> String {
        self.execute_engine.workers_status()
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the load task, the delay engine, then the execute engine.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let load_task = self.load_task.lock().take();
        if let Some((tx, handle)) = load_task {
            let _ = tx.send(());
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        self.delay_engine.shutdown();
        self.execute_engine.shutdown();
        info!("distro protocol stopped");
    }
}

impl Drop for DistroProtocol {
    fn drop(&mut self) {
        self.shutdown();
    }
}
