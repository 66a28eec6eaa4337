use std::time::Duration;
use std::time::Instant;

use bytes::Bytes;
use crossbeam_channel::Sender;
use distro_engine::DistroData;
use distro_engine::DistroDataStorage;
use distro_engine::DistroKey;
use distro_engine::DistroTransportAgent;
use distro_engine::Result;

pub const SELF_ADDRESS: &str = "10.0.0.1:8848";
pub const PEER_ADDRESS: &str = "10.0.0.2:8848";

/// Storage answering every key of one resource key with a fixed payload
pub struct FixedPayloadStorage {
    pub resource_key: String,
    pub payload: Bytes,
}

impl DistroDataStorage for FixedPayloadStorage {
    fn get_distro_data(
        &self,
        distro_key: &DistroKey,
    ) -> Option<DistroData> {
        (distro_key.resource_key() == self.resource_key)
            .then(|| DistroData::new(distro_key.clone(), self.payload.clone()))
    }

    fn get_datum_snapshot(&self) -> Option<DistroData> {
        None
    }
}

/// Blocking transport forwarding every call to a channel
pub struct RecordingTransport {
    pub calls: Sender<(DistroData, String)>,
}

impl DistroTransportAgent for RecordingTransport {
    fn support_callback_transport(&self) -> bool {
        false
    }

    fn sync_data(
        &self,
        data: DistroData,
        target_server: &str,
    ) -> Result<bool> {
        let _ = self.calls.send((data, target_server.to_string()));
        Ok(true)
    }

    fn sync_verify_data(
        &self,
        _verify_data: DistroData,
        _target_server: &str,
    ) -> Result<bool> {
        Ok(true)
    }
}

pub fn wait_until(
    timeout: Duration,
    condition: impl Fn() -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
