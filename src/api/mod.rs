//! Purpose: Define the stable public Rust API boundary for the bridge.
//! Exports: `Bridge`, the composer contract, call/result types, and errors.
//! Role: Public, additive-only surface used by the host binary and embedders.
//! Invariants: Hosts reach the slot only through `Bridge`, never directly.

mod bridge;

pub use bridge::{Bridge, BridgeConfig, DEFAULT_CHANNEL};
pub use crate::core::decode::{DecodeError, SendRequest};
pub use crate::core::dispatch::{DispatchOutcome, SEND_MESSAGE_METHOD};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind, to_wire_code};
pub use crate::core::invoker::{Composer, InvokeError};
pub use crate::core::resolver::{CallResult, Reply, ReplyReceiver, Resolver};
pub use crate::core::router::{CompletionHandle, CompletionOutcome, RouteOutcome};
pub use crate::core::slot::CorrelationId;
