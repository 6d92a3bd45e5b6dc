//! Purpose: Hold the one outstanding call correlation of a bridge.
//! Exports: `PendingSlot`, `PendingCall`, `CorrelationId`.
//! Role: The only shared mutable state; written by dispatch, drained by completion.
//! Invariants: At most one `PendingCall` exists per slot at any time.
//! Invariants: After `drain` returns a call, `drain` returns `None` until the next occupy.
//! Invariants: Resolvers never run while the slot lock is held.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::core::resolver::Resolver;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(u64);

impl CorrelationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call:{}", self.0)
    }
}

#[derive(Debug)]
pub struct PendingCall {
    pub id: CorrelationId,
    pub resolver: Resolver,
    pub since: Instant,
}

#[derive(Debug, Default)]
pub struct PendingSlot {
    inner: Mutex<Option<PendingCall>>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `resolver` if the slot is empty. When occupied the resolver is
    /// handed back untouched so the caller can answer it.
    pub fn try_occupy(&self, resolver: Resolver) -> Result<CorrelationId, Resolver> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Err(resolver);
        }
        let id = CorrelationId::next();
        *guard = Some(PendingCall {
            id,
            resolver,
            since: Instant::now(),
        });
        tracing::debug!(%id, "slot occupied");
        Ok(id)
    }

    pub fn drain(&self) -> Option<PendingCall> {
        self.lock().take()
    }

    /// Drains only when the pending call is `id`.
    pub fn release(&self, id: CorrelationId) -> Option<PendingCall> {
        let mut guard = self.lock();
        match guard.as_ref() {
            Some(pending) if pending.id == id => guard.take(),
            _ => None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    pub fn pending_id(&self) -> Option<CorrelationId> {
        self.lock().as_ref().map(|pending| pending.id)
    }

    // The register is a plain Option; a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, Option<PendingCall>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
