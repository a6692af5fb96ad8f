use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tessera_proto::Envelope;
use tokio::sync::oneshot;

/// Point-in-time view of a session's history counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStatus {
	/// Session identifier.
	pub id: String,
	/// Creation time of the history.
	pub start_time: DateTime<Utc>,
	/// Bytes used by the current history.
	pub size_in_bytes: u64,
	/// Hard size limit, 0 if unlimited.
	pub size_limit: u64,
	/// History size right after the last reset or load.
	pub auto_reset_base_size: u64,
	/// Size at which an autoreset should start, 0 if disabled.
	pub auto_reset_threshold: u64,
	/// Index of the first message of the current history.
	pub first_index: i64,
	/// Index of the last message.
	pub last_index: i64,
}

/// Commands for the session service actor.
#[derive(Debug)]
pub enum SessionCmd {
	/// Append a message.
	AddMessage {
		/// Message to append.
		msg: Envelope,
		/// Reply channel for acceptance.
		reply: oneshot::Sender<bool>,
	},
	/// Replace the history.
	Reset {
		/// New history content.
		msgs: Vec<Envelope>,
		/// Reply channel for acceptance.
		reply: oneshot::Sender<bool>,
	},
	/// Ban a user.
	AddBan {
		/// Banned user name.
		username: String,
		/// Banned address.
		address: IpAddr,
		/// External authentication identity, may be empty.
		ext_auth_id: String,
		/// Issuing operator.
		banned_by: String,
		/// Reply channel for acceptance.
		reply: oneshot::Sender<bool>,
	},
	/// Lift a ban.
	RemoveBan {
		/// Ban entry id.
		id: u32,
		/// Reply channel for the unbanned username.
		reply: oneshot::Sender<String>,
	},
	/// Check a connecting user against the ban list.
	IsBanned {
		/// Connecting address.
		address: IpAddr,
		/// External authentication identity, may be empty.
		ext_auth_id: String,
		/// Reply channel for the verdict.
		reply: oneshot::Sender<bool>,
	},
	/// Render the ban list for operators.
	BanList {
		/// Include addresses in the listing.
		show_addresses: bool,
		/// Reply channel for the JSON listing.
		reply: oneshot::Sender<Value>,
	},
	/// Register a user's display name.
	JoinUser {
		/// Session-local user id.
		id: u8,
		/// Display name.
		name: String,
	},
	/// Change the hard size limit.
	SetSizeLimit {
		/// New limit in bytes, 0 for unlimited.
		limit: u64,
	},
	/// Fetch history counters.
	Status {
		/// Reply channel for the snapshot.
		reply: oneshot::Sender<HistoryStatus>,
	},
}
