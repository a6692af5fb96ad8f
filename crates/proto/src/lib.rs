//! Shared wire types for tessera sessions.
//!
//! This crate defines the framed [`Envelope`] every session message travels
//! in, and the JSON server command protocol layered on top of it: requests
//! ([`ControlCommand`]) and replies ([`ControlReply`]). It has no knowledge of
//! session history or storage.

#![warn(missing_docs)]

pub mod command;
pub mod envelope;
pub mod reply;

pub use command::{CommandError, ControlCommand};
pub use envelope::{Envelope, EnvelopeError, HEADER_LEN, MAX_PAYLOAD_LEN, MessageKind};
pub use reply::{ControlReply, ReplyKind};
