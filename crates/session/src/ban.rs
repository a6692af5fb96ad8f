//! Per-session ban list.

use std::net::IpAddr;

use serde_json::{Map, Value, json};

/// A record barring a user identity from rejoining a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanEntry {
	/// Session-unique id, never reused.
	pub id: u32,
	/// Name the user had when banned.
	pub username: String,
	/// Banned network address.
	pub address: IpAddr,
	/// External authentication identity, empty if the user was not
	/// externally authenticated.
	pub ext_auth_id: String,
	/// Name of the moderator or operator who issued the ban.
	pub banned_by: String,
}

/// Ban entries of one session, keyed by id.
#[derive(Debug, Clone)]
pub struct BanList {
	entries: Vec<BanEntry>,
	next_id: u32,
}

impl Default for BanList {
	fn default() -> Self {
		Self::new()
	}
}

impl BanList {
	/// Creates an empty ban list. The first assigned id is 1.
	#[must_use]
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
			next_id: 1,
		}
	}

	/// Adds a ban and returns its new id.
	///
	/// Returns 0 without modifying the list if the username is empty, the
	/// address is unspecified, or the address or external identity is
	/// already banned.
	pub fn add_ban(
		&mut self,
		username: &str,
		address: IpAddr,
		ext_auth_id: &str,
		banned_by: &str,
	) -> u32 {
		if !self.accepts(username, address, ext_auth_id) {
			return 0;
		}
		let id = self.next_id;
		self.next_id += 1;
		self.push(id, username, address, ext_auth_id, banned_by);
		id
	}

	/// Restores a persisted ban under its original id.
	///
	/// Later ids are allocated past `id`, so restored ids are never handed
	/// out again. Returns 0 if `id` is 0 or taken, or the entry would be
	/// rejected by [`BanList::add_ban`].
	pub fn add_ban_with_id(
		&mut self,
		id: u32,
		username: &str,
		address: IpAddr,
		ext_auth_id: &str,
		banned_by: &str,
	) -> u32 {
		if id == 0 || self.get(id).is_some() || !self.accepts(username, address, ext_auth_id) {
			return 0;
		}
		self.next_id = self.next_id.max(id.saturating_add(1));
		self.push(id, username, address, ext_auth_id, banned_by);
		id
	}

	/// Removes a ban, returning the banned username or an empty string if
	/// `id` is unknown.
	pub fn remove_ban(&mut self, id: u32) -> String {
		match self.entries.iter().position(|e| e.id == id) {
			Some(idx) => self.entries.remove(idx).username,
			None => String::new(),
		}
	}

	/// Returns true if the address or the (non-empty) external identity is
	/// banned.
	#[must_use]
	pub fn is_banned(&self, address: IpAddr, ext_auth_id: &str) -> bool {
		let address = canonical(address);
		self.entries.iter().any(|e| {
			e.address == address || (!ext_auth_id.is_empty() && e.ext_auth_id == ext_auth_id)
		})
	}

	/// Looks up an entry by id.
	#[must_use]
	pub fn get(&self, id: u32) -> Option<&BanEntry> {
		self.entries.iter().find(|e| e.id == id)
	}

	/// Iterates entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &BanEntry> {
		self.entries.iter()
	}

	/// Number of entries.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if nobody is banned.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Ban list as shown to session operators.
	///
	/// Addresses are only included when `show_addresses` is set, which is
	/// reserved for moderators.
	#[must_use]
	pub fn to_json(&self, show_addresses: bool) -> Value {
		let list = self
			.entries
			.iter()
			.map(|e| {
				let mut o = Map::new();
				o.insert("id".into(), json!(e.id));
				o.insert("username".into(), json!(e.username));
				if show_addresses {
					o.insert("ip".into(), json!(e.address.to_string()));
				}
				if !e.ext_auth_id.is_empty() {
					o.insert("extauthid".into(), json!(e.ext_auth_id));
				}
				o.insert("bannedBy".into(), json!(e.banned_by));
				Value::Object(o)
			})
			.collect();
		Value::Array(list)
	}

	fn accepts(&self, username: &str, address: IpAddr, ext_auth_id: &str) -> bool {
		!username.is_empty() && !address.is_unspecified() && !self.is_banned(address, ext_auth_id)
	}

	fn push(&mut self, id: u32, username: &str, address: IpAddr, ext_auth_id: &str, banned_by: &str) {
		self.entries.push(BanEntry {
			id,
			username: username.to_string(),
			address: canonical(address),
			ext_auth_id: ext_auth_id.to_string(),
			banned_by: banned_by.to_string(),
		});
	}
}

/// IPv4-mapped IPv6 addresses are stored and compared in IPv4 form.
fn canonical(address: IpAddr) -> IpAddr {
	match address {
		IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(address, IpAddr::V4),
		v4 => v4,
	}
}
