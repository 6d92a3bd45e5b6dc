//! Purpose: Route the composer's terminal outcome back to the waiting caller.
//! Exports: `CompletionRouter`, `CompletionHandle`, `CompletionOutcome`, `RouteOutcome`, `outcome_result`.
//! Role: Environment-facing half of the bridge; drains the slot it shares with dispatch.
//! Invariants: Each pending call is resolved at most once, whatever the outcome.
//! Invariants: A completion with nothing pending is logged and discarded.
//! Invariants: A `CompletionHandle` only ever resolves the call it was minted for.

use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};
use crate::core::resolver::{CallResult, Reply};
use crate::core::slot::{CorrelationId, PendingCall, PendingSlot};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompletionOutcome {
    Sent,
    Cancelled,
    Failed(String),
    Unrecognized,
}

impl CompletionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CompletionOutcome::Sent => "sent",
            CompletionOutcome::Cancelled => "cancelled",
            CompletionOutcome::Failed(_) => "failed",
            CompletionOutcome::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteOutcome {
    Resolved(CorrelationId),
    Discarded,
}

pub fn outcome_result(outcome: CompletionOutcome) -> CallResult {
    match outcome {
        CompletionOutcome::Sent => Ok(Reply::Sent),
        // The user backing out is an answer, not a failure of the call.
        CompletionOutcome::Cancelled => Ok(Reply::Cancelled),
        CompletionOutcome::Failed(reason) => Err(Error::new(ErrorKind::SendFailed)
            .with_message("Failed to send message")
            .with_detail("reason", reason)),
        CompletionOutcome::Unrecognized => {
            Err(Error::new(ErrorKind::UnknownResult).with_message("Unknown result"))
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompletionRouter {
    slot: Arc<PendingSlot>,
}

impl CompletionRouter {
    pub fn new(slot: Arc<PendingSlot>) -> Self {
        Self { slot }
    }

    pub fn on_completion(&self, outcome: CompletionOutcome) -> RouteOutcome {
        let Some(pending) = self.slot.drain() else {
            tracing::warn!(
                outcome = outcome.label(),
                "completion arrived with no pending call; discarding"
            );
            return RouteOutcome::Discarded;
        };
        resolve_pending(pending, outcome)
    }

    /// Routes a completion that belongs to call `id`; anything else pending
    /// in the slot is left alone.
    pub fn on_completion_for(&self, id: CorrelationId, outcome: CompletionOutcome) -> RouteOutcome {
        let Some(pending) = self.slot.release(id) else {
            tracing::warn!(
                %id,
                pending = ?self.slot.pending_id(),
                outcome = outcome.label(),
                "completion for a call that is no longer pending; discarding"
            );
            return RouteOutcome::Discarded;
        };
        resolve_pending(pending, outcome)
    }

    pub fn handle_for(&self, id: CorrelationId) -> CompletionHandle {
        CompletionHandle {
            router: self.clone(),
            id,
        }
    }
}

fn resolve_pending(pending: PendingCall, outcome: CompletionOutcome) -> RouteOutcome {
    let id = pending.id;
    tracing::info!(
        %id,
        outcome = outcome.label(),
        elapsed_ms = pending.since.elapsed().as_millis() as u64,
        "resolving pending call"
    );
    pending.resolver.resolve(outcome_result(outcome));
    RouteOutcome::Resolved(id)
}

/// Given to the composer when it is presented; the environment calls
/// `complete` once the interactive UI is dismissed.
#[derive(Clone, Debug)]
pub struct CompletionHandle {
    router: CompletionRouter,
    id: CorrelationId,
}

impl CompletionHandle {
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    pub fn complete(self, outcome: CompletionOutcome) -> RouteOutcome {
        self.router.on_completion_for(self.id, outcome)
    }
}
