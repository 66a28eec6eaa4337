//! Test doubles shared by unit tests

use std::thread;
use std::thread::ThreadId;

use tokio::sync::mpsc;

use crate::DistroCallback;
use crate::Error;

#[derive(Debug)]
pub(crate) enum CallbackOutcome {
    Success { thread: ThreadId },
    Failed { thread: ThreadId, cause: Option<String> },
}

impl CallbackOutcome {
    pub(crate) fn thread(&self) -> ThreadId {
        match self {
            CallbackOutcome::Success { thread } | CallbackOutcome::Failed { thread, .. } => *thread,
        }
    }

    pub(crate) fn is_success(&self) -> bool {
        matches!(self, CallbackOutcome::Success { .. })
    }
}

/// Reports its completion, and the thread it ran on, through a channel
pub(crate) struct ChannelCallback {
    tx: mpsc::UnboundedSender<CallbackOutcome>,
}

impl ChannelCallback {
    pub(crate) fn pair() -> (Box<dyn DistroCallback>, mpsc::UnboundedReceiver<CallbackOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Box::new(ChannelCallback { tx }), rx)
    }
}

impl DistroCallback for ChannelCallback {
    fn on_success(self: Box<Self>) {
        let _ = self.tx.send(CallbackOutcome::Success {
            thread: thread::current().id(),
        });
    }

    fn on_failed(
        self: Box<Self>,
        cause: Option<Error>,
    ) {
        let _ = self.tx.send(CallbackOutcome::Failed {
            thread: thread::current().id(),
            cause: cause.map(|e| e.to_string()),
        });
    }
}
