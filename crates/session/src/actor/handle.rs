use std::net::IpAddr;

use serde_json::Value;
use tessera_proto::Envelope;
use tokio::sync::{mpsc, oneshot, watch};

use super::commands::{HistoryStatus, SessionCmd};
use crate::error::SessionError;

/// Handle for communicating with a [`SessionService`](super::SessionService).
#[derive(Clone, Debug)]
pub struct SessionHandle {
	tx: mpsc::Sender<SessionCmd>,
	last_index: watch::Receiver<i64>,
}

impl SessionHandle {
	pub(super) fn new(tx: mpsc::Sender<SessionCmd>, last_index: watch::Receiver<i64>) -> Self {
		Self { tx, last_index }
	}

	async fn request<T>(
		&self,
		make: impl FnOnce(oneshot::Sender<T>) -> SessionCmd,
	) -> Result<T, SessionError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(make(reply))
			.await
			.map_err(|_| SessionError::Closed)?;
		rx.await.map_err(|_| SessionError::Closed)
	}

	async fn notify(&self, cmd: SessionCmd) -> Result<(), SessionError> {
		self.tx.send(cmd).await.map_err(|_| SessionError::Closed)
	}

	/// Appends a message. `Ok(false)` means the history is full.
	pub async fn add_message(&self, msg: Envelope) -> Result<bool, SessionError> {
		self.request(|reply| SessionCmd::AddMessage { msg, reply }).await
	}

	/// Replaces the history. `Ok(false)` means the new history is too large
	/// and the old one was kept.
	pub async fn reset(&self, msgs: Vec<Envelope>) -> Result<bool, SessionError> {
		self.request(|reply| SessionCmd::Reset { msgs, reply }).await
	}

	/// Bans a user. `Ok(false)` means the entry was a duplicate or invalid.
	pub async fn add_ban(
		&self,
		username: impl Into<String>,
		address: IpAddr,
		ext_auth_id: impl Into<String>,
		banned_by: impl Into<String>,
	) -> Result<bool, SessionError> {
		let username = username.into();
		let ext_auth_id = ext_auth_id.into();
		let banned_by = banned_by.into();
		self.request(|reply| SessionCmd::AddBan {
			username,
			address,
			ext_auth_id,
			banned_by,
			reply,
		})
		.await
	}

	/// Lifts a ban, returning the unbanned username (empty if unknown).
	pub async fn remove_ban(&self, id: u32) -> Result<String, SessionError> {
		self.request(|reply| SessionCmd::RemoveBan { id, reply }).await
	}

	/// Checks a connecting user against the ban list.
	pub async fn is_banned(
		&self,
		address: IpAddr,
		ext_auth_id: impl Into<String>,
	) -> Result<bool, SessionError> {
		let ext_auth_id = ext_auth_id.into();
		self.request(|reply| SessionCmd::IsBanned {
			address,
			ext_auth_id,
			reply,
		})
		.await
	}

	/// Ban list as shown to operators.
	pub async fn ban_list(&self, show_addresses: bool) -> Result<Value, SessionError> {
		self.request(|reply| SessionCmd::BanList {
			show_addresses,
			reply,
		})
		.await
	}

	/// Registers a user's display name.
	pub async fn join_user(&self, id: u8, name: impl Into<String>) -> Result<(), SessionError> {
		self.notify(SessionCmd::JoinUser {
			id,
			name: name.into(),
		})
		.await
	}

	/// Changes the hard size limit.
	pub async fn set_size_limit(&self, limit: u64) -> Result<(), SessionError> {
		self.notify(SessionCmd::SetSizeLimit { limit }).await
	}

	/// Fetches the current history counters.
	pub async fn status(&self) -> Result<HistoryStatus, SessionError> {
		self.request(|reply| SessionCmd::Status { reply }).await
	}

	/// Subscribes to the index of the last message.
	///
	/// The receiver is marked changed whenever new messages become available.
	#[must_use]
	pub fn subscribe(&self) -> watch::Receiver<i64> {
		self.last_index.clone()
	}

	/// Returns true once the service has stopped.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}
