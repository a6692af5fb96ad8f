//! Collaborator interfaces invoked by [`SessionHistory`](crate::SessionHistory).
//!
//! The history never stores or broadcasts anything itself. Durable storage,
//! subscriber notification, user id bookkeeping and the autoreset policy are
//! injected at construction through the traits below.

use std::collections::HashMap;

use tessera_proto::Envelope;

use crate::ban::BanEntry;

/// Storage and notification callbacks for history changes.
///
/// Every callback runs after the in-memory state it reports has been
/// updated, in the same order as the mutations. Implementations must not
/// block; slow storage should queue internally.
pub trait HistoryHooks: Send {
	/// A message was appended.
	fn on_history_append(&mut self, msg: &Envelope) {
		let _ = msg;
	}

	/// A fresh history was primed from storage: `message_count` messages
	/// (indices `0..message_count`) totalling `size` bytes already exist.
	fn on_history_loaded(&mut self, size: u64, message_count: u64) {
		let _ = (size, message_count);
	}

	/// The history was replaced by `msgs`.
	fn on_history_reset(&mut self, msgs: &[Envelope]) {
		let _ = msgs;
	}

	/// A ban was added.
	fn on_ban_added(&mut self, entry: &BanEntry) {
		let _ = entry;
	}

	/// A ban was removed.
	fn on_ban_removed(&mut self, id: u32) {
		let _ = id;
	}

	/// New messages are available to subscribers.
	fn on_new_messages_available(&mut self) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HistoryHooks for NoHooks {}

/// Registry mapping session-local user ids to display names.
pub trait IdRegistry: Send {
	/// Records that `id` belongs to `name`.
	fn set_id_for_name(&mut self, id: u8, name: &str);
}

/// Plain map-backed [`IdRegistry`].
///
/// Names are not unique: two ids may share a display name. The reverse
/// lookup answers with the id that most recently registered the name.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
	names: HashMap<u8, String>,
	ids: HashMap<String, u8>,
}

impl NameRegistry {
	/// Display name last registered for `id`.
	#[must_use]
	pub fn name_for_id(&self, id: u8) -> Option<&str> {
		self.names.get(&id).map(String::as_str)
	}

	/// Id that most recently registered `name`, if any id still holds it.
	///
	/// When that id has since been renamed, the lowest remaining id with
	/// the name answers instead.
	#[must_use]
	pub fn id_for_name(&self, name: &str) -> Option<u8> {
		self.ids.get(name).copied()
	}
}

impl IdRegistry for NameRegistry {
	fn set_id_for_name(&mut self, id: u8, name: &str) {
		if let Some(old) = self.names.insert(id, name.to_string())
			&& old != name
			&& self.ids.get(&old) == Some(&id)
		{
			self.ids.remove(&old);
			let other = self
				.names
				.iter()
				.filter(|(_, n)| **n == old)
				.map(|(i, _)| *i)
				.min();
			if let Some(other) = other {
				self.ids.insert(old, other);
			}
		}
		self.ids.insert(name.to_string(), id);
	}
}

/// Deployment-specific autoreset policy.
pub trait ResetPolicy: Send + Sync {
	/// Bytes of growth above the last reset size that should trigger an
	/// autoreset. Zero disables autoreset.
	fn auto_reset_threshold(&self) -> u64;
}

/// [`ResetPolicy`] with a constant threshold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixedResetPolicy(pub u64);

impl ResetPolicy for FixedResetPolicy {
	fn auto_reset_threshold(&self) -> u64 {
		self.0
	}
}
