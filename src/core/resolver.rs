//! Purpose: Single-use completion sink for one bridge call.
//! Exports: `Resolver`, `ReplyReceiver`, `Reply`, `CallResult`.
//! Role: The "how to answer this call" handle that travels through the slot.
//! Invariants: A resolver delivers at most one result; `resolve` consumes it.
//! Invariants: Dropping an unresolved resolver delivers `Abandoned` exactly once.

use std::fmt;
use std::mem;

use tokio::sync::oneshot;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reply {
    Sent,
    Cancelled,
}

impl Reply {
    pub fn as_str(self) -> &'static str {
        match self {
            Reply::Sent => "sent",
            Reply::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type CallResult = Result<Reply, Error>;

type Sink = Box<dyn FnOnce(CallResult) + Send + 'static>;

enum ResolverState {
    Unresolved(Sink),
    Resolved,
}

pub struct Resolver {
    state: ResolverState,
}

impl Resolver {
    pub fn from_fn<F>(sink: F) -> Self
    where
        F: FnOnce(CallResult) + Send + 'static,
    {
        Self {
            state: ResolverState::Unresolved(Box::new(sink)),
        }
    }

    /// Resolver backed by a oneshot channel; the receiver half can be awaited
    /// from async code or polled/blocked on from plain threads.
    pub fn channel() -> (Self, ReplyReceiver) {
        let (tx, rx) = oneshot::channel();
        let resolver = Self::from_fn(move |result| {
            // Receiver gone means nobody is listening anymore.
            let _ = tx.send(result);
        });
        (resolver, ReplyReceiver { rx })
    }

    pub fn resolve(mut self, result: CallResult) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: CallResult) {
        if let ResolverState::Unresolved(sink) = mem::replace(&mut self.state, ResolverState::Resolved)
        {
            sink(result);
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if matches!(self.state, ResolverState::Unresolved(_)) {
            tracing::warn!("call dropped without a result; answering with CALL_ABANDONED");
            self.deliver(Err(abandoned_error()));
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            ResolverState::Unresolved(_) => "unresolved",
            ResolverState::Resolved => "resolved",
        };
        f.debug_struct("Resolver").field("state", &state).finish()
    }
}

#[derive(Debug)]
pub struct ReplyReceiver {
    rx: oneshot::Receiver<CallResult>,
}

impl ReplyReceiver {
    pub async fn recv(self) -> CallResult {
        self.rx.await.unwrap_or_else(|_| Err(abandoned_error()))
    }

    /// Returns the result once it has been delivered; `None` while pending
    /// and after the result has already been taken.
    pub fn try_recv(&mut self) -> Option<CallResult> {
        self.rx.try_recv().ok()
    }

    /// Must not be called from within an async runtime.
    pub fn blocking_recv(self) -> CallResult {
        self.rx
            .blocking_recv()
            .unwrap_or_else(|_| Err(abandoned_error()))
    }
}

fn abandoned_error() -> Error {
    Error::new(ErrorKind::Abandoned).with_message("call was dropped before it completed")
}
