use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::component::complete;
use crate::DistroCallback;
use crate::DistroData;
use crate::DistroDataProcessor;
use crate::DistroDataStorage;
use crate::DistroKey;
use crate::DistroTransportAgent;
use crate::Error;
use crate::Result;
use crate::SyncConfig;
use crate::TransportError;

/// Delivers data to receive-side processors registered in this process,
/// one per target address.
///
/// Built with [`LocalTransportAgent::with_runtime`], it announces callback
/// support and completes callbacks on the runtime's blocking pool instead
/// of the calling worker. A delivery that outlives `sync_timeout` fails its
/// callback with [`TransportError::Timeout`]; the delivery itself still runs
/// to completion in the background.
pub struct LocalTransportAgent {
    self_address: String,
    processors: DashMap<String, Arc<dyn DistroDataProcessor>>,
    storages: DashMap<String, Arc<dyn DistroDataStorage>>,
    runtime: Option<Handle>,
    sync_timeout: Duration,
}

impl std::fmt::Debug for LocalTransportAgent {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LocalTransportAgent")
            .field("self_address", &self.self_address)
            .field("peers", &self.processors.len())
            .field("callback", &self.runtime.is_some())
            .field("sync_timeout", &self.sync_timeout)
            .finish()
    }
}

impl LocalTransportAgent {
    pub fn new(self_address: impl Into<String>) -> Self {
        Self {
            self_address: self_address.into(),
            processors: DashMap::new(),
            storages: DashMap::new(),
            runtime: None,
            sync_timeout: SyncConfig::default().sync_timeout(),
        }
    }

    /// Callback transport bounded by `sync_timeout`, usually
    /// `settings.sync.sync_timeout()`
    pub fn with_runtime(
        self_address: impl Into<String>,
        runtime: Handle,
        sync_timeout: Duration,
    ) -> Self {
        Self {
            runtime: Some(runtime),
            sync_timeout,
            ..Self::new(self_address)
        }
    }

    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }

    /// Receive side of `target_server`
    pub fn register_peer(
        &self,
        target_server: impl Into<String>,
        processor: Arc<dyn DistroDataProcessor>,
    ) {
        self.processors.insert(target_server.into(), processor);
    }

    /// Storage of `target_server`, served to `get_data` and snapshot pulls
    pub fn register_peer_storage(
        &self,
        target_server: impl Into<String>,
        storage: Arc<dyn DistroDataStorage>,
    ) {
        self.storages.insert(target_server.into(), storage);
    }

    pub fn remove_peer(
        &self,
        target_server: &str,
    ) {
        self.processors.remove(target_server);
        self.storages.remove(target_server);
    }

    fn find_processor(
        &self,
        target_server: &str,
    ) -> Option<Arc<dyn DistroDataProcessor>> {
        self.processors.get(target_server).map(|p| p.value().clone())
    }

    fn find_storage(
        &self,
        target_server: &str,
    ) -> Result<Arc<dyn DistroDataStorage>> {
        self.storages
            .get(target_server)
            .map(|s| s.value().clone())
            .ok_or_else(|| TransportError::PeerNotFound(target_server.to_string()).into())
    }

    /// Run `deliver` against the processor of `target_server` off the
    /// calling thread, then complete `callback` with its outcome.
    fn deliver_with_callback<F>(
        &self,
        target_server: &str,
        callback: Box<dyn DistroCallback>,
        deliver: F,
    ) where
        F: FnOnce(Arc<dyn DistroDataProcessor>) -> bool + Send + 'static,
    {
        let Some(processor) = self.find_processor(target_server) else {
            debug!(target_server, "unknown peer, fail callback");
            callback.on_failed(Some(TransportError::PeerNotFound(target_server.to_string()).into()));
            return;
        };
        let target = target_server.to_string();
        let Some(runtime) = &self.runtime else {
            let result = delivery_result(deliver(processor), target);
            complete(result, callback);
            return;
        };

        let timeout = self.sync_timeout;
        runtime.spawn(async move {
            let delivery = tokio::task::spawn_blocking(move || deliver(processor));
            let result = match tokio::time::timeout(timeout, delivery).await {
                Ok(Ok(applied)) => delivery_result(applied, target),
                Ok(Err(e)) => Err(TransportError::Rejected {
                    target,
                    reason: format!("delivery aborted: {e}"),
                }
                .into()),
                Err(_) => {
                    warn!(target_server = %target, "delivery exceeded {:?}", timeout);
                    Err(TransportError::Timeout {
                        target,
                        duration: timeout,
                    }
                    .into())
                }
            };
            let _ = tokio::task::spawn_blocking(move || complete(result, callback));
        });
    }
}

fn delivery_result(
    applied: bool,
    target: String,
) -> Result<bool> {
    if applied {
        Ok(true)
    } else {
        Err(Error::Transport(TransportError::Rejected {
            target,
            reason: "processor refused data".to_string(),
        }))
    }
}

impl DistroTransportAgent for LocalTransportAgent {
    fn support_callback_transport(&self) -> bool {
        self.runtime.is_some()
    }

    fn sync_data(
        &self,
        data: DistroData,
        target_server: &str,
    ) -> Result<bool> {
        let Some(processor) = self.find_processor(target_server) else {
            debug!(target_server, "unknown peer, drop {}", data.distro_key());
            return Ok(false);
        };
        trace!(target_server, "deliver {} {}", data.operation(), data.distro_key());
        Ok(processor.process_data(data))
    }

    fn sync_data_with_callback(
        &self,
        data: DistroData,
        target_server: &str,
        callback: Box<dyn DistroCallback>,
    ) {
        self.deliver_with_callback(target_server, callback, move |processor| processor.process_data(data));
    }

    fn sync_verify_data(
        &self,
        verify_data: DistroData,
        target_server: &str,
    ) -> Result<bool> {
        let Some(processor) = self.find_processor(target_server) else {
            debug!(target_server, "unknown peer, drop verify {}", verify_data.distro_key());
            return Ok(false);
        };
        Ok(processor.process_verify_data(verify_data, &self.self_address))
    }

    fn sync_verify_data_with_callback(
        &self,
        verify_data: DistroData,
        target_server: &str,
        callback: Box<dyn DistroCallback>,
    ) {
        let source = self.self_address.clone();
        self.deliver_with_callback(target_server, callback, move |processor| {
            processor.process_verify_data(verify_data, &source)
        });
    }

    fn get_data(
        &self,
        distro_key: &DistroKey,
        target_server: &str,
    ) -> Result<Option<DistroData>> {
        Ok(self.find_storage(target_server)?.get_distro_data(distro_key))
    }

    fn get_datum_snapshot(
        &self,
        target_server: &str,
    ) -> Result<Option<DistroData>> {
        Ok(self.find_storage(target_server)?.get_datum_snapshot())
    }
}
