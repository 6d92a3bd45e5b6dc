//! Purpose: Start the interactive composer for an occupied slot.
//! Exports: `Composer`, `CapabilityInvoker`, `InvokeError`.
//! Role: Seam between the bridge and the environment's native compose UI.
//! Invariants: `present` is only called after `can_send` reported true.
//! Invariants: On failure nothing was presented, so no completion will follow.

use std::fmt;
use std::sync::Arc;

use crate::core::decode::SendRequest;
use crate::core::error::{Error, ErrorKind};
use crate::core::router::{CompletionHandle, CompletionRouter};
use crate::core::slot::CorrelationId;

/// Contract the bridge expects from the environment's message composer.
///
/// `present` hands over control: the composer shows its UI pre-filled with the
/// request and calls `on_dismiss.complete(..)` once the user is done. It may
/// do so from any thread, including synchronously inside `present`.
pub trait Composer: Send + Sync {
    fn can_send(&self) -> bool;
    fn present(&self, request: SendRequest, on_dismiss: CompletionHandle);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvokeError {
    CapabilityUnavailable,
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::CapabilityUnavailable => write!(f, "composer cannot send right now"),
        }
    }
}

impl std::error::Error for InvokeError {}

impl From<InvokeError> for Error {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::CapabilityUnavailable => Error::new(ErrorKind::Unavailable)
                .with_message("SMS is not available")
                .with_hint("The device cannot send text messages right now."),
        }
    }
}

#[derive(Clone)]
pub struct CapabilityInvoker {
    composer: Arc<dyn Composer>,
    router: CompletionRouter,
}

impl CapabilityInvoker {
    pub fn new(composer: Arc<dyn Composer>, router: CompletionRouter) -> Self {
        Self { composer, router }
    }

    /// `id` is the slot entry this presentation answers; the composer's
    /// handle is bound to it.
    pub fn invoke(&self, id: CorrelationId, request: SendRequest) -> Result<(), InvokeError> {
        if !self.composer.can_send() {
            return Err(InvokeError::CapabilityUnavailable);
        }
        tracing::debug!(%id, recipient = %request.recipient, "presenting composer");
        self.composer.present(request, self.router.handle_for(id));
        Ok(())
    }
}
