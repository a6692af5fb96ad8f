//! In-memory history store.
//!
//! Keeps the current history's messages so that joining or lagging clients
//! can be served catch-up batches. The store is a cheap cloneable handle:
//! one clone is installed as the history's [`HistoryHooks`] and the others
//! are handed to whatever streams messages out to clients.

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_proto::Envelope;

use crate::hooks::HistoryHooks;

#[derive(Debug, Default)]
struct Inner {
	first_index: i64,
	messages: Vec<Envelope>,
	generation: u64,
}

/// Shared in-memory copy of a session's current history.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
	inner: Arc<Mutex<Inner>>,
}

/// Result of [`InMemoryHistory::batch_after`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
	/// Messages to deliver, in order.
	pub messages: Vec<Envelope>,
	/// Index of the last message delivered (or of the current end of the
	/// history if nothing was delivered).
	pub last_index: i64,
	/// True if the requested position predates the last reset and the
	/// batch restarts from the beginning of the current history.
	pub restarted: bool,
}

impl InMemoryHistory {
	/// Creates an empty store starting at index 0. A history resumed with
	/// [`SessionHistory::history_loaded`](crate::SessionHistory::history_loaded)
	/// moves the start past the restored messages, which this store does not
	/// hold.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Index of the first stored message.
	#[must_use]
	pub fn first_index(&self) -> i64 {
		self.inner.lock().first_index
	}

	/// Index of the last stored message, `first_index() - 1` when empty.
	#[must_use]
	pub fn last_index(&self) -> i64 {
		let inner = self.inner.lock();
		inner.first_index + inner.messages.len() as i64 - 1
	}

	/// Number of stored messages.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.lock().messages.len()
	}

	/// Returns true if no messages are stored.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.inner.lock().messages.is_empty()
	}

	/// Number of resets seen so far.
	#[must_use]
	pub fn generation(&self) -> u64 {
		self.inner.lock().generation
	}

	/// Messages with an index greater than `after`, up to `limit` of them.
	///
	/// A client positioned before the current history's first index missed
	/// a reset; it receives the current history from the start.
	#[must_use]
	pub fn batch_after(&self, after: i64, limit: usize) -> Batch {
		let inner = self.inner.lock();
		let restarted = after < inner.first_index - 1;
		let start = if restarted {
			0
		} else {
			usize::try_from(after + 1 - inner.first_index).unwrap_or(usize::MAX)
		};
		let messages: Vec<Envelope> = inner
			.messages
			.iter()
			.skip(start)
			.take(limit)
			.cloned()
			.collect();
		let last_index = if messages.is_empty() {
			inner.first_index + inner.messages.len() as i64 - 1
		} else {
			inner.first_index + (start + messages.len()) as i64 - 1
		};
		Batch {
			messages,
			last_index,
			restarted,
		}
	}
}

impl HistoryHooks for InMemoryHistory {
	fn on_history_append(&mut self, msg: &Envelope) {
		self.inner.lock().messages.push(msg.clone());
	}

	fn on_history_loaded(&mut self, _size: u64, message_count: u64) {
		let mut inner = self.inner.lock();
		inner.first_index = i64::try_from(message_count).unwrap_or(i64::MAX);
		inner.messages.clear();
	}

	fn on_history_reset(&mut self, msgs: &[Envelope]) {
		let mut inner = self.inner.lock();
		inner.first_index += inner.messages.len() as i64;
		inner.messages = msgs.to_vec();
		inner.generation += 1;
	}
}
