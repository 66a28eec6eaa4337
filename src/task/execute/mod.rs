//! Partitioned task execution.
//!
//! A fixed set of single-threaded FIFO lanes. A task is routed to exactly one
//! lane by hash, so tasks sharing a dispatch key run strictly in arrival order
//! while unrelated keys proceed in parallel without any shared lock.
//!
//! ```text
//! dispatch(key, task)
//!        │ hash(key) & (n - 1)
//!        ▼
//!  ┌───────────┐  ┌───────────┐       ┌───────────┐
//!  │ worker-0  │  │ worker-1  │  ...  │ worker-n-1│   bounded queue each,
//!  │ (thread)  │  │ (thread)  │       │ (thread)  │   send blocks when full
//!  └───────────┘  └───────────┘       └───────────┘
//! ```

mod engine;
mod worker;
pub use engine::*;


use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use crate::DistroKey;
use crate::Result;

/// Unit of work executed on a worker lane.
///
/// `Err` results and panics are logged by the lane and never stop it.
pub trait ExecuteTask: Send + 'static {
    fn run(self: Box<Self>) -> Result<()>;

    /// Short label used in logs
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> ExecuteTask for F
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    fn run(self: Box<Self>) -> Result<()> {
        (*self)()
    }
}

/// Key that selects a worker lane.
///
/// Every copy of one entity must land on the same lane whatever peer it is
/// addressed to, so a [`DistroKey`] hashes its resource key only. Plain string
/// keys hash the same way, `"svc-a"` and any `DistroKey` for `svc-a` share a
/// lane.
pub trait DispatchKey {
    fn dispatch_hash(&self) -> u64;
}

impl DispatchKey for DistroKey {
    fn dispatch_hash(&self) -> u64 {
        DistroKey::dispatch_hash(self)
    }
}

impl DispatchKey for str {
    fn dispatch_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl DispatchKey for String {
    fn dispatch_hash(&self) -> u64 {
        self.as_str().dispatch_hash()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
