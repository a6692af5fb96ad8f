//! Server commands: administrative requests sent as JSON inside a
//! [`MessageKind::SERVER_COMMAND`] envelope.
//!
//! The encoded object is `{"cmd": name, "args": [...], "kwargs": {...}}`,
//! where `args` and `kwargs` are omitted entirely when empty.

use std::num::NonZeroU8;

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::envelope::{self, Envelope, MessageKind};

/// Errors produced while decoding a server command.
#[derive(Debug, Error)]
pub enum CommandError {
	/// Envelope is not a server command.
	#[error("not a server command envelope (kind {0})")]
	WrongKind(u8),
	/// Payload is not valid JSON.
	#[error("invalid command JSON: {0}")]
	Json(#[from] serde_json::Error),
	/// The document has no string `cmd` field.
	#[error("command name missing")]
	MissingName,
}

/// A request addressed to the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlCommand {
	/// Command name, e.g. `kick-user`.
	pub cmd: String,
	/// Positional arguments.
	pub args: Vec<Value>,
	/// Keyword arguments.
	pub kwargs: Map<String, Value>,
}

impl ControlCommand {
	/// Creates a command without arguments.
	pub fn new(cmd: impl Into<String>) -> Self {
		Self {
			cmd: cmd.into(),
			args: Vec::new(),
			kwargs: Map::new(),
		}
	}

	/// Encodes the command as its JSON object.
	#[must_use]
	pub fn to_json(&self) -> Value {
		let mut o = Map::new();
		o.insert("cmd".into(), Value::String(self.cmd.clone()));
		if !self.args.is_empty() {
			o.insert("args".into(), Value::Array(self.args.clone()));
		}
		if !self.kwargs.is_empty() {
			o.insert("kwargs".into(), Value::Object(self.kwargs.clone()));
		}
		Value::Object(o)
	}

	/// Wraps the command in an envelope addressed from the server context.
	pub fn to_envelope(&self) -> envelope::Result<Envelope> {
		Envelope::server_command(0, &self.to_json())
	}

	/// Decodes a command received by the server.
	pub fn from_envelope(env: &Envelope) -> Result<Self, CommandError> {
		if env.kind() != MessageKind::SERVER_COMMAND {
			return Err(CommandError::WrongKind(env.kind().0));
		}
		let doc: Value = serde_json::from_slice(env.payload())?;
		Self::from_json(&doc)
	}

	/// Reads a command from its JSON object form.
	///
	/// Missing or mistyped `args`/`kwargs` are treated as empty.
	pub fn from_json(doc: &Value) -> Result<Self, CommandError> {
		let cmd = doc
			.get("cmd")
			.and_then(Value::as_str)
			.ok_or(CommandError::MissingName)?;
		let args = doc
			.get("args")
			.and_then(Value::as_array)
			.cloned()
			.unwrap_or_default();
		let kwargs = doc
			.get("kwargs")
			.and_then(Value::as_object)
			.cloned()
			.unwrap_or_default();
		Ok(Self {
			cmd: cmd.to_string(),
			args,
			kwargs,
		})
	}

	/// Builds and encodes a command in one step.
	pub fn make(
		cmd: impl Into<String>,
		args: Vec<Value>,
		kwargs: Map<String, Value>,
	) -> envelope::Result<Envelope> {
		Self {
			cmd: cmd.into(),
			args,
			kwargs,
		}
		.to_envelope()
	}

	/// Kicks a user, optionally banning them too.
	///
	/// `target` is the user's context id. Context 0 is the server itself and
	/// cannot be kicked.
	pub fn kick(target: NonZeroU8, ban: bool) -> envelope::Result<Envelope> {
		let mut kwargs = Map::new();
		if ban {
			kwargs.insert("ban".into(), Value::Bool(true));
		}
		Self::make("kick-user", vec![json!(target.get())], kwargs)
	}

	/// Asks the server to announce the session at a listing server.
	pub fn announce(url: &str, private_mode: bool) -> envelope::Result<Envelope> {
		let mut kwargs = Map::new();
		if private_mode {
			kwargs.insert("private".into(), Value::Bool(true));
		}
		Self::make("announce-session", vec![json!(url)], kwargs)
	}

	/// Asks the server to remove an announcement.
	pub fn unannounce(url: &str) -> envelope::Result<Envelope> {
		Self::make("unlist-session", vec![json!(url)], Map::new())
	}

	/// Removes a ban list entry.
	pub fn unban(entry_id: u32) -> envelope::Result<Envelope> {
		Self::make("remove-ban", vec![json!(entry_id)], Map::new())
	}

	/// Mutes or unmutes a user.
	pub fn mute(target: u8, mute: bool) -> envelope::Result<Envelope> {
		Self::make("mute", vec![json!(target), json!(mute)], Map::new())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn user(id: u8) -> NonZeroU8 {
		NonZeroU8::new(id).unwrap()
	}

	fn payload_json(env: &Envelope) -> String {
		String::from_utf8(env.payload().to_vec()).unwrap()
	}

	#[test]
	fn kick_with_ban() {
		let env = ControlCommand::kick(user(5), true).unwrap();
		assert_eq!(env.kind(), MessageKind::SERVER_COMMAND);
		assert_eq!(env.context_id(), 0);
		assert_eq!(
			payload_json(&env),
			r#"{"cmd":"kick-user","args":[5],"kwargs":{"ban":true}}"#
		);
	}

	#[test]
	fn kick_without_ban_omits_kwargs() {
		let env = ControlCommand::kick(user(12), false).unwrap();
		assert_eq!(payload_json(&env), r#"{"cmd":"kick-user","args":[12]}"#);
	}

	#[test]
	fn targets_cover_the_full_context_range() {
		assert_eq!(
			payload_json(&ControlCommand::kick(NonZeroU8::MAX, false).unwrap()),
			r#"{"cmd":"kick-user","args":[255]}"#
		);
		assert_eq!(
			payload_json(&ControlCommand::mute(u8::MAX, true).unwrap()),
			r#"{"cmd":"mute","args":[255,true]}"#
		);
		assert!(NonZeroU8::new(0).is_none());
	}

	#[test]
	fn announce_and_unannounce() {
		assert_eq!(
			payload_json(&ControlCommand::announce("https://list.example", true).unwrap()),
			r#"{"cmd":"announce-session","args":["https://list.example"],"kwargs":{"private":true}}"#
		);
		assert_eq!(
			payload_json(&ControlCommand::announce("https://list.example", false).unwrap()),
			r#"{"cmd":"announce-session","args":["https://list.example"]}"#
		);
		assert_eq!(
			payload_json(&ControlCommand::unannounce("https://list.example").unwrap()),
			r#"{"cmd":"unlist-session","args":["https://list.example"]}"#
		);
	}

	#[test]
	fn unban_and_mute() {
		assert_eq!(
			payload_json(&ControlCommand::unban(3).unwrap()),
			r#"{"cmd":"remove-ban","args":[3]}"#
		);
		assert_eq!(
			payload_json(&ControlCommand::mute(7, false).unwrap()),
			r#"{"cmd":"mute","args":[7,false]}"#
		);
	}

	#[test]
	fn bare_command_has_only_name() {
		let env = ControlCommand::make("reset-session", Vec::new(), Map::new()).unwrap();
		assert_eq!(payload_json(&env), r#"{"cmd":"reset-session"}"#);
	}

	#[test]
	fn server_side_decode() {
		let env = ControlCommand::kick(user(9), true).unwrap();
		let cmd = ControlCommand::from_envelope(&env).unwrap();
		assert_eq!(cmd.cmd, "kick-user");
		assert_eq!(cmd.args, vec![json!(9)]);
		assert_eq!(cmd.kwargs.get("ban"), Some(&Value::Bool(true)));
	}

	#[test]
	fn decode_rejects_bad_input() {
		let chat = Envelope::new(MessageKind::CHAT, 1, &b"{}"[..]).unwrap();
		assert!(matches!(
			ControlCommand::from_envelope(&chat),
			Err(CommandError::WrongKind(35))
		));

		let garbage = Envelope::new(MessageKind::SERVER_COMMAND, 1, &b"{nope"[..]).unwrap();
		assert!(matches!(
			ControlCommand::from_envelope(&garbage),
			Err(CommandError::Json(_))
		));

		let nameless = Envelope::server_command(1, &json!({"args": [1]})).unwrap();
		assert!(matches!(
			ControlCommand::from_envelope(&nameless),
			Err(CommandError::MissingName)
		));
	}
}
