//! Transport agents shipped with the crate.
//!
//! Network transports live with the embedding server; this crate only
//! carries the in-process agent used for single node deployments and tests.

mod local;
pub use local::*;
