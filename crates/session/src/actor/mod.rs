//! Single-writer session service actor.
//!
//! This actor owns one [`SessionHistory`](crate::SessionHistory) for the
//! lifetime of a session. Every mutation, whether drawing traffic from a
//! client connection or an administrative kick/ban/reset, is sent through a
//! bounded command queue and applied in arrival order, so size checks and
//! index assignment never race.
//!
//! # Invariants
//!
//! - Single Writer: only the service task touches the history after start.
//! - Publish After Apply: the last-index watch channel is updated after the
//!   history (and its hooks) have applied a mutation.
//! - Drop To Terminate: the service exits and drops the history once every
//!   [`SessionHandle`] is gone.

mod commands;
mod handle;
mod service;

pub use commands::{HistoryStatus, SessionCmd};
pub use handle::SessionHandle;
pub use service::SessionService;

#[cfg(test)]
mod tests;
