//! Purpose: Library crate behind the `sendit` bridge host and its tests.
//! Exports: `api` (public bridge surface), `core` (slot, routing, errors), `notice`.
//! Role: Correlates one UI-channel call with one interactive compose session.
//! Invariants: At most one send is in flight per bridge; each call is answered once.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
