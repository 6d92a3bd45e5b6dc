// Core bridge pieces: decoding, the pending-call slot, and call routing.
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod resolver;
pub mod router;
pub mod slot;
