//! Purpose: Assemble one slot, router, invoker, and dispatcher around a composer.
//! Exports: `Bridge`, `BridgeConfig`, `DEFAULT_CHANNEL`.
//! Role: The object a host embeds; UI calls go in via `dispatch`, the
//!   environment reports back via `complete` or a `CompletionHandle`.
//! Invariants: Dispatcher and router share exactly one `PendingSlot`.
//! Invariants: `Bridge` is `Send + Sync`; completions may arrive on any thread.

use std::sync::Arc;

use serde_json::Value;

use crate::core::dispatch::{DispatchOutcome, MethodDispatcher};
use crate::core::error::{Error, ErrorKind};
use crate::core::invoker::{CapabilityInvoker, Composer};
use crate::core::resolver::Resolver;
use crate::core::router::{CompletionHandle, CompletionOutcome, CompletionRouter, RouteOutcome};
use crate::core::slot::{CorrelationId, PendingSlot};

pub const DEFAULT_CHANNEL: &str = "com.sendit/messages";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BridgeConfig {
    pub channel: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

pub struct Bridge {
    config: BridgeConfig,
    slot: Arc<PendingSlot>,
    router: CompletionRouter,
    dispatcher: MethodDispatcher,
}

impl Bridge {
    pub fn new(composer: Arc<dyn Composer>) -> Self {
        Self::with_config(composer, BridgeConfig::default())
    }

    pub fn with_config(composer: Arc<dyn Composer>, config: BridgeConfig) -> Self {
        let slot = Arc::new(PendingSlot::new());
        let router = CompletionRouter::new(Arc::clone(&slot));
        let invoker = CapabilityInvoker::new(composer, router.clone());
        let dispatcher = MethodDispatcher::new(Arc::clone(&slot), invoker);
        tracing::debug!(channel = %config.channel, "bridge ready");
        Self {
            config,
            slot,
            router,
            dispatcher,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn dispatch(&self, method: &str, arguments: &Value, resolver: Resolver) -> DispatchOutcome {
        self.dispatcher.dispatch(method, arguments, resolver)
    }

    pub fn complete(&self, outcome: CompletionOutcome) -> RouteOutcome {
        self.router.on_completion(outcome)
    }

    /// Handle bound to the call pending right now, if any.
    pub fn completion_handle(&self) -> Option<CompletionHandle> {
        self.slot.pending_id().map(|id| self.router.handle_for(id))
    }

    /// Answers a still-pending call with `Abandoned`, e.g. when the host is
    /// shutting down and no completion can arrive anymore.
    pub fn abandon_pending(&self, reason: &str) -> Option<CorrelationId> {
        let pending = self.slot.drain()?;
        tracing::warn!(id = %pending.id, reason, "abandoning pending call");
        pending.resolver.resolve(Err(Error::new(ErrorKind::Abandoned)
            .with_message("call abandoned before the composer finished")
            .with_detail("reason", reason)));
        Some(pending.id)
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_occupied()
    }

    pub fn pending_id(&self) -> Option<CorrelationId> {
        self.slot.pending_id()
    }
}
