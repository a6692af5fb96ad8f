use tokio::sync::{mpsc, watch};

use super::commands::{HistoryStatus, SessionCmd};
use super::handle::SessionHandle;
use crate::history::SessionHistory;

/// Actor owning a session's history.
pub struct SessionService {
	history: SessionHistory,
	rx: mpsc::Receiver<SessionCmd>,
	last_index: watch::Sender<i64>,
}

impl SessionService {
	/// Spawns the service on the current tokio runtime.
	///
	/// A history resumed from storage must already have been primed with
	/// [`SessionHistory::history_loaded`]; once the service runs, the only
	/// way to touch the history is through the returned handle.
	///
	/// # Panics
	///
	/// Panics if `capacity` is 0 or if called outside a tokio runtime.
	pub fn start(history: SessionHistory, capacity: usize) -> SessionHandle {
		let (tx, rx) = mpsc::channel(capacity);
		let (last_index, last_index_rx) = watch::channel(history.last_index());
		tracing::info!(session = %history.id(), capacity, "session service started");
		let service = Self {
			history,
			rx,
			last_index,
		};
		tokio::spawn(service.run());
		SessionHandle::new(tx, last_index_rx)
	}

	/// Primes `history` with counters restored from storage and spawns the
	/// service.
	///
	/// The history is resumed before the command queue exists, so no client
	/// message can slip in ahead of the loaded content.
	///
	/// # Panics
	///
	/// Panics if `history` was already started, see
	/// [`SessionHistory::history_loaded`].
	pub fn start_loaded(
		mut history: SessionHistory,
		size: u64,
		message_count: u64,
		capacity: usize,
	) -> SessionHandle {
		history.history_loaded(size, message_count);
		Self::start(history, capacity)
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle(cmd);
		}
		tracing::info!(
			session = %self.history.id(),
			last_index = self.history.last_index(),
			"session service stopped"
		);
	}

	fn handle(&mut self, cmd: SessionCmd) {
		match cmd {
			SessionCmd::AddMessage { msg, reply } => {
				let accepted = self.history.add_message(&msg);
				if accepted {
					self.publish();
				}
				let _ = reply.send(accepted);
			}
			SessionCmd::Reset { msgs, reply } => {
				let accepted = self.history.reset(&msgs);
				if accepted {
					self.publish();
				}
				let _ = reply.send(accepted);
			}
			SessionCmd::AddBan {
				username,
				address,
				ext_auth_id,
				banned_by,
				reply,
			} => {
				let added = self
					.history
					.add_ban(&username, address, &ext_auth_id, &banned_by);
				let _ = reply.send(added);
			}
			SessionCmd::RemoveBan { id, reply } => {
				let _ = reply.send(self.history.remove_ban(id));
			}
			SessionCmd::IsBanned {
				address,
				ext_auth_id,
				reply,
			} => {
				let _ = reply.send(self.history.ban_list().is_banned(address, &ext_auth_id));
			}
			SessionCmd::BanList {
				show_addresses,
				reply,
			} => {
				let _ = reply.send(self.history.ban_list_json(show_addresses));
			}
			SessionCmd::JoinUser { id, name } => {
				self.history.join_user(id, &name);
			}
			SessionCmd::SetSizeLimit { limit } => {
				tracing::debug!(session = %self.history.id(), limit, "size limit changed");
				self.history.set_size_limit(limit);
			}
			SessionCmd::Status { reply } => {
				let _ = reply.send(self.status());
			}
		}
	}

	fn publish(&self) {
		self.last_index.send_replace(self.history.last_index());
	}

	fn status(&self) -> HistoryStatus {
		let h = &self.history;
		HistoryStatus {
			id: h.id().to_string(),
			start_time: h.start_time(),
			size_in_bytes: h.size_in_bytes(),
			size_limit: h.size_limit(),
			auto_reset_base_size: h.auto_reset_base_size(),
			auto_reset_threshold: h.effective_auto_reset_threshold(),
			first_index: h.first_index(),
			last_index: h.last_index(),
		}
	}
}
