//! Session history and administration core for tessera.
//!
//! A [`SessionHistory`] is the authoritative, size-bounded, totally ordered
//! log of one collaborative session, together with the session's
//! [`BanList`]. Storage, notification, user-name bookkeeping and the
//! autoreset policy are injected through the traits in [`hooks`]. The
//! [`SessionService`] actor wraps a history behind a bounded command queue so
//! that every writer goes through one serialization point.

#![warn(missing_docs)]

pub mod actor;
pub mod ban;
pub mod config;
pub mod error;
pub mod history;
pub mod hooks;
pub mod memory;

pub use actor::{HistoryStatus, SessionCmd, SessionHandle, SessionService};
pub use ban::{BanEntry, BanList};
pub use config::SessionConfig;
pub use error::{ConfigError, SessionError};
pub use history::SessionHistory;
pub use hooks::{FixedResetPolicy, HistoryHooks, IdRegistry, NameRegistry, NoHooks, ResetPolicy};
pub use memory::{Batch, InMemoryHistory};
pub use tessera_proto as proto;
