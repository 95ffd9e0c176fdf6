//! Batched command execution.
//!
//! A submission replays a guest command buffer against one context. Binds are
//! checked against a [`BoundState`] that lives only for that submission, so
//! state changed outside the batch can never be elided by mistake.

mod bound;
mod interpreter;

pub use bound::{BoundState, TRACKED_UNITS};
pub use interpreter::{execute, submit, Executed, SubmitStats};
