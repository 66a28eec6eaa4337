//! Distro Replication Error Hierarchy
//!
//! Errors are categorized by the layer that raised them. None of them ever
//! reaches the code that triggered a mutation: `dispatch` is fire-and-forget,
//! and task failures are logged at the worker boundary or routed to the
//! resource type's failed-task handler.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings validation or loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Partitioned executor and delay engine failures
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    /// Peer communication failures raised by a transport agent
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Local data storage failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// Engine no longer accepts tasks
    #[error("Task engine has been shut down")]
    EngineShutdown,

    /// OS thread for a worker lane could not be started
    #[error("Failed to spawn worker thread {name}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A task panicked inside a worker lane
    #[error("Task panicked on {worker}: {message}")]
    TaskPanicked { worker: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Target address is not a known peer
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    /// Peer answered but refused to apply the data
    #[error("Peer {target} rejected data: {reason}")]
    Rejected { target: String, reason: String },

    /// Peer did not answer in time
    #[error("Sync to {target} timed out after {duration:?}")]
    Timeout { target: String, duration: Duration },

    /// Unreachable peer with source context
    #[error("Network unreachable: {source}")]
    Unreachable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Serialization failures for snapshot payloads
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Payload did not carry the expected content
    #[error("Invalid payload for {resource_type}: {reason}")]
    InvalidPayload {
        resource_type: String,
        reason: String,
    },
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Storage(StorageError::BincodeError(e))
    }
}
