//! Purpose: Entry point for channel method calls.
//! Exports: `MethodDispatcher`, `DispatchOutcome`, `SEND_MESSAGE_METHOD`.
//! Role: Runs decode, occupy, invoke for `sendMessage`; answers everything else.
//! Invariants: `Pending(id)` means call `id` was still in the slot when
//!   `dispatch` returned; a composer that completes inside `present` yields
//!   `Resolved`. Either way the call is answered exactly once.
//! Invariants: Unknown methods and decode failures never touch the slot.

use std::sync::Arc;

use serde_json::Value;

use crate::core::decode::decode;
use crate::core::error::{Error, ErrorKind};
use crate::core::invoker::CapabilityInvoker;
use crate::core::resolver::Resolver;
use crate::core::slot::{CorrelationId, PendingSlot};

pub const SEND_MESSAGE_METHOD: &str = "sendMessage";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DispatchOutcome {
    /// The resolver has already been answered.
    Resolved,
    /// The call was parked in the slot and handed to the composer.
    Pending(CorrelationId),
}

#[derive(Clone)]
pub struct MethodDispatcher {
    slot: Arc<PendingSlot>,
    invoker: CapabilityInvoker,
}

impl MethodDispatcher {
    pub fn new(slot: Arc<PendingSlot>, invoker: CapabilityInvoker) -> Self {
        Self { slot, invoker }
    }

    pub fn dispatch(&self, method: &str, arguments: &Value, resolver: Resolver) -> DispatchOutcome {
        tracing::debug!(method, "dispatching call");
        match method {
            SEND_MESSAGE_METHOD => self.send_message(arguments, resolver),
            _ => {
                resolver.resolve(Err(Error::new(ErrorKind::NotImplemented)
                    .with_message(format!("method not implemented: {method}"))));
                DispatchOutcome::Resolved
            }
        }
    }

    fn send_message(&self, arguments: &Value, resolver: Resolver) -> DispatchOutcome {
        let request = match decode(arguments) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting malformed sendMessage arguments");
                resolver.resolve(Err(err.into()));
                return DispatchOutcome::Resolved;
            }
        };

        let id = match self.slot.try_occupy(resolver) {
            Ok(id) => id,
            Err(resolver) => {
                tracing::warn!(
                    pending = ?self.slot.pending_id(),
                    "sendMessage rejected; another send is in progress"
                );
                resolver.resolve(Err(Error::new(ErrorKind::Busy)
                    .with_message("A message is already being composed")
                    .with_hint("Wait for the current send to finish, then retry.")));
                return DispatchOutcome::Resolved;
            }
        };

        match self.invoker.invoke(id, request) {
            Ok(()) if self.slot.pending_id() == Some(id) => DispatchOutcome::Pending(id),
            Ok(()) => DispatchOutcome::Resolved,
            Err(err) => {
                // A completion racing in from the environment may already
                // own the slot; only answer what is still ours.
                if let Some(pending) = self.slot.release(id) {
                    pending.resolver.resolve(Err(err.into()));
                }
                DispatchOutcome::Resolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decode::SendRequest;
    use crate::core::invoker::Composer;
    use crate::core::resolver::{CallResult, ReplyReceiver};
    use crate::core::router::{CompletionHandle, CompletionRouter};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubComposer {
        available: AtomicBool,
        presents: AtomicUsize,
    }

    impl Composer for StubComposer {
        fn can_send(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn present(&self, _request: SendRequest, _on_dismiss: CompletionHandle) {
            self.presents.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        slot: Arc<PendingSlot>,
        composer: Arc<StubComposer>,
        dispatcher: MethodDispatcher,
    }

    fn fixture(available: bool) -> Fixture {
        let slot = Arc::new(PendingSlot::new());
        let composer = Arc::new(StubComposer {
            available: AtomicBool::new(available),
            presents: AtomicUsize::new(0),
        });
        let router = CompletionRouter::new(Arc::clone(&slot));
        let invoker = CapabilityInvoker::new(composer.clone(), router);
        Fixture {
            dispatcher: MethodDispatcher::new(Arc::clone(&slot), invoker),
            slot,
            composer,
        }
    }

    fn call(fixture: &Fixture, method: &str, arguments: Value) -> (DispatchOutcome, ReplyReceiver) {
        let (resolver, rx) = Resolver::channel();
        (fixture.dispatcher.dispatch(method, &arguments, resolver), rx)
    }

    fn expect_error(result: Option<CallResult>) -> Error {
        result.expect("resolved").expect_err("error")
    }

    #[test]
    fn valid_send_is_left_pending() {
        let f = fixture(true);
        let (outcome, mut rx) = call(
            &f,
            SEND_MESSAGE_METHOD,
            json!({"recipient": "+15551234567", "message": "hi"}),
        );
        let DispatchOutcome::Pending(id) = outcome else {
            panic!("expected pending, got {outcome:?}");
        };
        assert_eq!(f.slot.pending_id(), Some(id));
        assert_eq!(f.composer.presents.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn decode_failure_resolves_without_occupying() {
        let f = fixture(true);
        let (outcome, mut rx) = call(&f, SEND_MESSAGE_METHOD, json!({"recipient": "+1555"}));
        assert_eq!(outcome, DispatchOutcome::Resolved);
        let err = expect_error(rx.try_recv());
        assert_eq!(err.code(), "INVALID_ARGUMENTS");
        assert_eq!(err.field(), Some("message"));
        assert!(!f.slot.is_occupied());
        assert_eq!(f.composer.presents.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unavailable_composer_releases_slot() {
        let f = fixture(false);
        let (outcome, mut rx) = call(
            &f,
            SEND_MESSAGE_METHOD,
            json!({"recipient": "+1555", "message": "hi"}),
        );
        assert_eq!(outcome, DispatchOutcome::Resolved);
        assert_eq!(expect_error(rx.try_recv()).code(), "SMS_NOT_AVAILABLE");
        assert!(!f.slot.is_occupied());
    }

    #[test]
    fn second_send_is_rejected_while_pending() {
        let f = fixture(true);
        let args = json!({"recipient": "+1555", "message": "hi"});
        let (first, mut first_rx) = call(&f, SEND_MESSAGE_METHOD, args.clone());
        let (second, mut second_rx) = call(&f, SEND_MESSAGE_METHOD, args);

        assert_eq!(second, DispatchOutcome::Resolved);
        assert_eq!(expect_error(second_rx.try_recv()).code(), "ALREADY_IN_PROGRESS");
        assert_eq!(DispatchOutcome::Pending(f.slot.pending_id().expect("pending")), first);
        assert!(first_rx.try_recv().is_none());
        assert_eq!(f.composer.presents.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_method_is_not_implemented_for_any_slot_state() {
        let f = fixture(true);
        let (_, mut rx) = call(&f, "deleteMessage", json!({}));
        assert_eq!(expect_error(rx.try_recv()).code(), "NOT_IMPLEMENTED");
        assert!(!f.slot.is_occupied());

        let (pending, _pending_rx) = call(
            &f,
            SEND_MESSAGE_METHOD,
            json!({"recipient": "+1555", "message": "hi"}),
        );
        let (_, mut rx) = call(&f, "deleteMessage", json!(null));
        assert_eq!(expect_error(rx.try_recv()).code(), "NOT_IMPLEMENTED");
        assert_eq!(DispatchOutcome::Pending(f.slot.pending_id().expect("pending")), pending);
    }
}
