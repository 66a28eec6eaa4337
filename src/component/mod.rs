//! Pluggable per resource-type components.
//!
//! Every resource type ("instance", "service-metadata", ...) binds its own
//! storage, transport agent, failed-task handler and receive-side processor
//! in the [`DistroComponentHolder`]. Tasks resolve them by resource type at
//! execution time.

mod holder;
pub use holder::*;


#[cfg(test)]
use mockall::automock;

use crate::DataOperation;
use crate::DistroData;
use crate::DistroKey;
use crate::Error;
use crate::Result;

/// Completion signal of a callback-driven transport call.
///
/// Both methods consume the callback, so exactly one of them runs, at most
/// once. Implementations may be invoked on any thread.
pub trait DistroCallback: Send + 'static {
    fn on_success(self: Box<Self>);

    fn on_failed(
        self: Box<Self>,
        cause: Option<Error>,
    );
}

/// Authoritative local snapshot reads for one resource type
#[cfg_attr(test, automock)]
pub trait DistroDataStorage: Send + Sync + 'static {
    /// Current data for `distro_key`, or `None` when the entity no longer exists
    fn get_distro_data(
        &self,
        distro_key: &DistroKey,
    ) -> Option<DistroData>;

    /// Every entity of this resource type in one payload
    fn get_datum_snapshot(&self) -> Option<DistroData>;

    /// Digests sent to peers during reconciliation
    fn get_verify_data(&self) -> Vec<DistroData> {
        Vec::new()
    }
}

/// Ships [`DistroData`] to a peer.
///
/// An implementation offers either a blocking call or a callback-driven one,
/// announced through [`DistroTransportAgent::support_callback_transport`].
/// Implementations may talk to a real network or deliver in-process.
#[cfg_attr(test, automock)]
pub trait DistroTransportAgent: Send + Sync + 'static {
    /// `true` if the `*_with_callback` methods complete asynchronously
    fn support_callback_transport(&self) -> bool;

    /// Blocking delivery.
    ///
    /// # Returns
    /// - `Ok(true)` delivered and applied
    /// - `Ok(false)` rejected or failed
    /// - `Err(_)` transport error; handled the same way as `Ok(false)`
    fn sync_data(
        &self,
        data: DistroData,
        target_server: &str,
    ) -> Result<bool>;

    /// Callback-driven delivery. The default runs the blocking call and
    /// completes the callback in place.
    fn sync_data_with_callback(
        &self,
        data: DistroData,
        target_server: &str,
        callback: Box<dyn DistroCallback>,
    ) {
        complete(self.sync_data(data, target_server), callback);
    }

    fn sync_verify_data(
        &self,
        verify_data: DistroData,
        target_server: &str,
    ) -> Result<bool>;

    fn sync_verify_data_with_callback(
        &self,
        verify_data: DistroData,
        target_server: &str,
        callback: Box<dyn DistroCallback>,
    ) {
        complete(self.sync_verify_data(verify_data, target_server), callback);
    }

    /// Pull one entity from a peer
    fn get_data(
        &self,
        distro_key: &DistroKey,
        target_server: &str,
    ) -> Result<Option<DistroData>> {
        let _ = (distro_key, target_server);
        Ok(None)
    }

    /// Pull a full snapshot from a peer
    fn get_datum_snapshot(
        &self,
        target_server: &str,
    ) -> Result<Option<DistroData>> {
        let _ = target_server;
        Ok(None)
    }
}

/// Retry policy invoked on every failed propagation of a resource type
#[cfg_attr(test, automock)]
pub trait DistroFailedTaskHandler: Send + Sync + 'static {
    fn retry(
        &self,
        distro_key: &DistroKey,
        action: DataOperation,
    );
}

/// Receive side: applies data shipped by peers to the local store
#[cfg_attr(test, automock)]
pub trait DistroDataProcessor: Send + Sync + 'static {
    /// Resource type this processor handles
    fn process_type(&self) -> String;

    fn process_data(
        &self,
        data: DistroData,
    ) -> bool;

    fn process_verify_data(
        &self,
        verify_data: DistroData,
        source_address: &str,
    ) -> bool;

    fn process_snapshot(
        &self,
        snapshot: DistroData,
    ) -> bool;
}

pub(crate) fn complete(
    result: Result<bool>,
    callback: Box<dyn DistroCallback>,
) {
    match result {
        Ok(true) => callback.on_success(),
        Ok(false) => callback.on_failed(None),
        Err(e) => callback.on_failed(Some(e)),
    }
}
