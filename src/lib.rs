//! Distro: eventually consistent (AP) replication core.
//!
//! Local mutations are propagated to every peer through a delay/merge stage
//! and a fixed set of hash-partitioned worker lanes. Per resource type
//! components (storage, transport agent, retry policy, receive-side
//! processor) are plugged into a [`DistroComponentHolder`]; outcomes are
//! counted in [`DistroRecordsHolder`] and exported through `prometheus`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use distro_engine::DataOperation;
//! use distro_engine::DistroKey;
//! use distro_engine::DistroProtocol;
//! use distro_engine::DistroSettings;
//! use distro_engine::StaticMembers;
//!
//! # fn main() -> distro_engine::Result<()> {
//! let settings = DistroSettings::load(None)?;
//! let members = StaticMembers::new("10.0.0.1:8848", vec!["10.0.0.2:8848".to_string()]);
//! let protocol = DistroProtocol::new(settings, Arc::new(members))?;
//! // register storage, transport agent and retry handler for "instance" here
//! protocol.start_load_task()?;
//! protocol.sync(&DistroKey::local("svc-a", "instance"), DataOperation::Change);
//! protocol.shutdown();
//! # Ok(())
//! # }
//! ```

mod component;
mod config;
pub mod constants;
mod entity;
mod errors;
mod membership;
pub mod metrics;
mod protocol;
mod record;
mod storage;
pub mod task;
mod transport;

pub use component::*;
pub use config::*;
pub use entity::*;
pub use errors::*;
pub use membership::*;
pub use protocol::*;
pub use record::*;
pub use storage::*;
pub use task::*;
pub use transport::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
