//! Authoritative, size-bounded message log of one session.
//!
//! # Mental Model
//!
//! The history is an append-only sequence of [`Envelope`]s addressed by a
//! monotonically increasing index. A reset replaces the content with a new
//! (usually compacted) message list whose indices continue after the old
//! ones, so subscribers can tell stale positions from current ones.
//!
//! # Invariants
//!
//! - `last_index >= first_index - 1`; equality means the log is empty.
//! - `size_in_bytes` is the framed size of every message since the last
//!   reset (or since [`SessionHistory::history_loaded`]).
//! - With a size limit set, no append or reset ever leaves `size_in_bytes`
//!   above the limit. Offending calls are rejected whole.
//! - Hooks observe mutations after they are applied, in mutation order.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_proto::Envelope;

use crate::ban::BanList;
use crate::hooks::{FixedResetPolicy, HistoryHooks, IdRegistry, NameRegistry, NoHooks, ResetPolicy};

/// Message log, size accounting and ban list of one session.
pub struct SessionHistory {
	id: String,
	start_time: DateTime<Utc>,
	size_in_bytes: u64,
	size_limit: u64,
	auto_reset_base_size: u64,
	first_index: i64,
	last_index: i64,
	started: bool,
	ban_list: BanList,
	hooks: Box<dyn HistoryHooks>,
	ids: Box<dyn IdRegistry>,
	policy: Arc<dyn ResetPolicy>,
}

impl std::fmt::Debug for SessionHistory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionHistory")
			.field("id", &self.id)
			.field("start_time", &self.start_time)
			.field("size_in_bytes", &self.size_in_bytes)
			.field("size_limit", &self.size_limit)
			.field("auto_reset_base_size", &self.auto_reset_base_size)
			.field("first_index", &self.first_index)
			.field("last_index", &self.last_index)
			.field("bans", &self.ban_list.len())
			.finish_non_exhaustive()
	}
}

impl SessionHistory {
	/// Creates an empty, unlimited history with no-op collaborators and
	/// autoreset disabled.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			start_time: Utc::now(),
			size_in_bytes: 0,
			size_limit: 0,
			auto_reset_base_size: 0,
			first_index: 0,
			last_index: -1,
			started: false,
			ban_list: BanList::new(),
			hooks: Box::new(NoHooks),
			ids: Box::new(NameRegistry::default()),
			policy: Arc::new(FixedResetPolicy(0)),
		}
	}

	/// Replaces the storage/notification hooks.
	#[must_use]
	pub fn with_hooks(mut self, hooks: impl HistoryHooks + 'static) -> Self {
		self.hooks = Box::new(hooks);
		self
	}

	/// Replaces the user id registry.
	#[must_use]
	pub fn with_id_registry(mut self, ids: impl IdRegistry + 'static) -> Self {
		self.ids = Box::new(ids);
		self
	}

	/// Replaces the autoreset policy.
	#[must_use]
	pub fn with_policy(mut self, policy: Arc<dyn ResetPolicy>) -> Self {
		self.policy = policy;
		self
	}

	/// Sets the hard size limit in bytes (0 = unlimited).
	#[must_use]
	pub fn with_size_limit(mut self, limit: u64) -> Self {
		self.size_limit = limit;
		self
	}

	/// Session identifier.
	#[must_use]
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Creation time of this history.
	#[must_use]
	pub fn start_time(&self) -> DateTime<Utc> {
		self.start_time
	}

	/// Bytes used by the current history.
	#[must_use]
	pub fn size_in_bytes(&self) -> u64 {
		self.size_in_bytes
	}

	/// Hard size limit in bytes, 0 if unlimited.
	#[must_use]
	pub fn size_limit(&self) -> u64 {
		self.size_limit
	}

	/// Changes the hard size limit. Existing content is never truncated;
	/// lowering the limit below the current size only blocks further appends.
	pub fn set_size_limit(&mut self, limit: u64) {
		self.size_limit = limit;
	}

	/// History size right after the last reset or load.
	#[must_use]
	pub fn auto_reset_base_size(&self) -> u64 {
		self.auto_reset_base_size
	}

	/// Index of the first message of the current history.
	#[must_use]
	pub fn first_index(&self) -> i64 {
		self.first_index
	}

	/// Index of the last message, `first_index() - 1` when empty.
	#[must_use]
	pub fn last_index(&self) -> i64 {
		self.last_index
	}

	/// Returns true if the current history holds no messages.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.last_index < self.first_index
	}

	/// Returns true once the size limit has been reached.
	#[must_use]
	pub fn is_out_of_space(&self) -> bool {
		self.size_limit > 0 && self.size_in_bytes >= self.size_limit
	}

	/// Ban list of this session.
	#[must_use]
	pub fn ban_list(&self) -> &BanList {
		&self.ban_list
	}

	/// Ban list as the JSON array sent to session operators. Addresses are
	/// included only if `show_addresses` is set.
	#[must_use]
	pub fn ban_list_json(&self, show_addresses: bool) -> serde_json::Value {
		self.ban_list.to_json(show_addresses)
	}

	/// Bans a user. Returns false if the ban list rejected the entry.
	pub fn add_ban(
		&mut self,
		username: &str,
		address: IpAddr,
		ext_auth_id: &str,
		banned_by: &str,
	) -> bool {
		let id = self.ban_list.add_ban(username, address, ext_auth_id, banned_by);
		if id == 0 {
			return false;
		}
		if let Some(entry) = self.ban_list.get(id) {
			tracing::info!(session = %self.id, id, username, banned_by, "ban added");
			self.hooks.on_ban_added(entry);
		}
		true
	}

	/// Lifts a ban, returning the unbanned username or an empty string if
	/// there was no such ban.
	pub fn remove_ban(&mut self, id: u32) -> String {
		let unbanned = self.ban_list.remove_ban(id);
		if !unbanned.is_empty() {
			tracing::info!(session = %self.id, id, username = %unbanned, "ban removed");
			self.hooks.on_ban_removed(id);
		}
		unbanned
	}

	/// Records the display name of a joining user.
	pub fn join_user(&mut self, id: u8, name: &str) {
		self.ids.set_id_for_name(id, name);
	}

	/// Primes a fresh history with the size and message count of history
	/// restored from storage. The restored messages occupy indices
	/// `0..message_count`.
	///
	/// # Panics
	///
	/// Panics if called twice, or after any message was added or the history
	/// was reset. Resuming must happen before the session accepts traffic.
	/// Also panics if `message_count` does not fit an index.
	pub fn history_loaded(&mut self, size: u64, message_count: u64) {
		assert!(
			!self.started && self.last_index == -1,
			"history_loaded called on a non-empty history"
		);
		let Ok(count) = i64::try_from(message_count) else {
			panic!("history_loaded: message count {message_count} out of range");
		};
		self.started = true;
		self.size_in_bytes = size;
		self.last_index = count - 1;
		self.auto_reset_base_size = size;
		tracing::info!(session = %self.id, size, message_count, "history loaded");
		self.hooks.on_history_loaded(size, message_count);
	}

	/// Appends a message.
	///
	/// Returns false without changing anything if the history is out of
	/// space or the message would push it past the size limit.
	pub fn add_message(&mut self, msg: &Envelope) -> bool {
		let len = msg.length() as u64;
		if self.is_out_of_space()
			|| (self.size_limit > 0 && self.size_in_bytes.saturating_add(len) > self.size_limit)
		{
			tracing::warn!(
				session = %self.id,
				size = self.size_in_bytes,
				limit = self.size_limit,
				len,
				"history full, message rejected"
			);
			return false;
		}

		self.started = true;
		self.size_in_bytes += len;
		self.last_index += 1;
		tracing::debug!(session = %self.id, index = self.last_index, len, "message added");
		self.hooks.on_history_append(msg);
		self.hooks.on_new_messages_available();
		true
	}

	/// Replaces the history with `msgs`.
	///
	/// Indices continue after the old history. Returns false, leaving the old
	/// history fully intact, if the new one would exceed the size limit.
	pub fn reset(&mut self, msgs: &[Envelope]) -> bool {
		let new_size: u64 = msgs.iter().map(|m| m.length() as u64).sum();
		if self.size_limit > 0 && new_size > self.size_limit {
			tracing::warn!(
				session = %self.id,
				new_size,
				limit = self.size_limit,
				"reset image too large, keeping old history"
			);
			return false;
		}

		self.started = true;
		self.size_in_bytes = new_size;
		self.first_index = self.last_index + 1;
		self.last_index += msgs.len() as i64;
		self.auto_reset_base_size = new_size;
		tracing::info!(
			session = %self.id,
			first = self.first_index,
			last = self.last_index,
			size = new_size,
			"history reset"
		);
		self.hooks.on_history_reset(msgs);
		self.hooks.on_new_messages_available();
		true
	}

	/// Size at which the session should start an autoreset, or 0 if
	/// autoreset is disabled.
	///
	/// The policy threshold is counted from the size of the last reset and
	/// capped at 90% of the hard limit, leaving room for the reset itself.
	#[must_use]
	pub fn effective_auto_reset_threshold(&self) -> u64 {
		let t = self.policy.auto_reset_threshold();
		if t == 0 {
			return 0;
		}
		let t = t.saturating_add(self.auto_reset_base_size);
		if self.size_limit > 0 {
			t.min(ninety_percent(self.size_limit))
		} else {
			t
		}
	}
}

fn ninety_percent(limit: u64) -> u64 {
	(u128::from(limit) * 9 / 10) as u64
}
