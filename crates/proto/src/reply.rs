//! Server replies and notifications carried in server command envelopes.
//!
//! Every reply is a JSON object with a `type` string and an optional
//! `message`. The remaining fields depend on the type and are kept verbatim
//! in [`ControlReply::raw`], so callers can pick out what they need without
//! this crate modelling every variant.

use serde_json::{Map, Value, json};

use crate::envelope::{self, Envelope, MessageKind};

/// Reply field naming a ban action.
pub const KEY_BAN: &str = "ban";
/// Reply field naming a kick action.
pub const KEY_KICK: &str = "kick";
/// Reply field naming an operator grant.
pub const KEY_OP_GIVE: &str = "opgive";
/// Reply field naming an operator revocation.
pub const KEY_OP_TAKE: &str = "optake";
/// Reply field naming a cancelled reset.
pub const KEY_RESET_CANCEL: &str = "resetcancel";
/// Reply field naming a failed reset.
pub const KEY_RESET_FAILED: &str = "resetfailed";
/// Reply field naming a reset being prepared.
pub const KEY_RESET_PREPARE: &str = "resetprepare";
/// Reply field naming a session termination.
pub const KEY_TERMINATE_SESSION: &str = "terminatesession";
/// Reply field naming a trust grant.
pub const KEY_TRUST_GIVE: &str = "trustgive";
/// Reply field naming a trust revocation.
pub const KEY_TRUST_TAKE: &str = "trusttake";

/// Classification of a server reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
	/// Unrecognized type, or a reply that failed to decode.
	Unknown,
	/// Login phase traffic.
	Login,
	/// General chat-style notification.
	Message,
	/// Urgent notification.
	Alert,
	/// An error occurred.
	Error,
	/// Command result.
	Result,
	/// Server log entry.
	Log,
	/// Session configuration update.
	SessionConf,
	/// History is nearing its size limit.
	SizeLimitWarning,
	/// Periodic status update.
	Status,
	/// Session reset state change.
	Reset,
	/// Number of messages queued for delivery, for progress display.
	Catchup,
	/// Server asks the client to perform a reset.
	ResetRequest,
}

impl ReplyKind {
	/// Maps a `type` string to its kind.
	#[must_use]
	pub fn from_type_str(s: &str) -> Self {
		match s {
			"login" => Self::Login,
			"msg" => Self::Message,
			"alert" => Self::Alert,
			"error" => Self::Error,
			"result" => Self::Result,
			"log" => Self::Log,
			"sessionconf" => Self::SessionConf,
			"sizelimit" => Self::SizeLimitWarning,
			"status" => Self::Status,
			"reset" => Self::Reset,
			"autoreset" => Self::ResetRequest,
			"catchup" => Self::Catchup,
			_ => Self::Unknown,
		}
	}

	/// Wire `type` string, or `None` for [`ReplyKind::Unknown`].
	#[must_use]
	pub fn as_type_str(self) -> Option<&'static str> {
		Some(match self {
			Self::Unknown => return None,
			Self::Login => "login",
			Self::Message => "msg",
			Self::Alert => "alert",
			Self::Error => "error",
			Self::Result => "result",
			Self::Log => "log",
			Self::SessionConf => "sessionconf",
			Self::SizeLimitWarning => "sizelimit",
			Self::Status => "status",
			Self::Reset => "reset",
			Self::ResetRequest => "autoreset",
			Self::Catchup => "catchup",
		})
	}
}

/// A decoded reply or notification from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlReply {
	/// Reply classification.
	pub kind: ReplyKind,
	/// Human readable text, empty if absent.
	pub message: String,
	/// The full reply object.
	pub raw: Map<String, Value>,
}

impl ControlReply {
	fn unknown() -> Self {
		Self {
			kind: ReplyKind::Unknown,
			message: String::new(),
			raw: Map::new(),
		}
	}

	/// Decodes a reply envelope.
	///
	/// Never fails: envelopes of the wrong kind and malformed JSON are logged
	/// and decode as [`ReplyKind::Unknown`] with an empty message.
	#[must_use]
	pub fn from_envelope(env: &Envelope) -> Self {
		if env.kind() != MessageKind::SERVER_COMMAND {
			tracing::warn!(kind = env.kind().0, "bad server reply envelope");
			return Self::unknown();
		}

		match serde_json::from_slice::<Value>(env.payload()) {
			Ok(doc) => Self::from_json(doc),
			Err(err) => {
				tracing::warn!(error = %err, "server reply JSON parsing error");
				Self::unknown()
			}
		}
	}

	/// Reads a reply from a parsed JSON document.
	///
	/// A document that is not an object is treated as an empty object.
	#[must_use]
	pub fn from_json(doc: Value) -> Self {
		let raw = match doc {
			Value::Object(o) => o,
			_ => Map::new(),
		};
		let kind = raw
			.get("type")
			.and_then(Value::as_str)
			.map_or(ReplyKind::Unknown, ReplyKind::from_type_str);
		let message = raw
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();
		Self { kind, message, raw }
	}

	/// Wraps a reply object in an envelope from the server context.
	pub fn make(data: Map<String, Value>) -> envelope::Result<Envelope> {
		Envelope::server_command(0, &Value::Object(data))
	}

	/// Error reply with a machine readable code.
	pub fn error(message: &str, code: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "error",
			"message": message,
			"code": code,
		})))
	}

	/// Error reply for a failed command, prefixed with the command name.
	pub fn command_error(command: &str, message: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "error",
			"message": format!("{command}: {message}"),
		})))
	}

	/// Plain chat-style notification.
	pub fn message(message: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({ "type": "msg", "message": message })))
	}

	/// Urgent notification.
	pub fn alert(message: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({ "type": "alert", "message": message })))
	}

	/// Translatable notification.
	///
	/// Clients that know `key` display their own translation, filled in from
	/// `params`; others fall back to the literal `message`.
	pub fn key_message(
		message: &str,
		key: &str,
		params: Map<String, Value>,
	) -> envelope::Result<Envelope> {
		Self::make(keyed("msg", message, key, params))
	}

	/// Translatable urgent notification.
	pub fn key_alert(
		message: &str,
		key: &str,
		params: Map<String, Value>,
	) -> envelope::Result<Envelope> {
		Self::make(keyed("alert", message, key, params))
	}

	/// Number of messages queued for the client.
	pub fn catchup(count: u64) -> envelope::Result<Envelope> {
		Self::make(object(json!({ "type": "catchup", "count": count })))
	}

	/// Server log entry; `data` carries the structured log fields.
	pub fn log(message: &str, mut data: Map<String, Value>) -> envelope::Result<Envelope> {
		data.insert("type".into(), json!("log"));
		data.insert("message".into(), json!(message));
		Self::make(data)
	}

	/// First login message, advertising protocol version and server flags.
	pub fn login_greeting(message: &str, version: u32, flags: &[Value]) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "login",
			"message": message,
			"version": version,
			"flags": flags,
		})))
	}

	/// Welcome message with the server title and session listing.
	pub fn login_welcome(message: &str, title: &str, sessions: &[Value]) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "login",
			"message": message,
			"title": title,
			"sessions": sessions,
		})))
	}

	/// Server title update during login.
	pub fn login_title(message: &str, title: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "login",
			"message": message,
			"title": title,
		})))
	}

	/// Added or updated sessions during login.
	pub fn login_sessions(message: &str, sessions: &[Value]) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "login",
			"message": message,
			"sessions": sessions,
		})))
	}

	/// Removed sessions during login.
	pub fn login_remove_sessions(message: &str, remove: &[Value]) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "login",
			"message": message,
			"remove": remove,
		})))
	}

	/// Session reset state change (`init`, `reset`, ...).
	pub fn reset(message: &str, state: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "reset",
			"message": message,
			"state": state,
		})))
	}

	/// Asks a client to perform an autoreset producing at most `max_size` bytes.
	///
	/// With `query` set the server is only asking who is able to do it.
	pub fn reset_request(max_size: u64, query: bool) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "autoreset",
			"maxSize": max_size,
			"query": query,
		})))
	}

	/// Login result: a password is required.
	pub fn result_password_needed(message: &str, state: &str) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "result",
			"message": message,
			"state": state,
		})))
	}

	/// Login result: authenticated.
	pub fn result_login_ok(
		message: &str,
		state: &str,
		flags: &[Value],
		ident: &str,
		guest: bool,
	) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "result",
			"message": message,
			"state": state,
			"flags": flags,
			"ident": ident,
			"guest": guest,
		})))
	}

	/// Login result: external authentication is required.
	///
	/// `group` is omitted when empty.
	pub fn result_ext_auth_needed(
		message: &str,
		state: &str,
		ext_auth_url: &str,
		nonce: &str,
		group: &str,
		avatar: bool,
	) -> envelope::Result<Envelope> {
		let mut o = object(json!({
			"type": "result",
			"message": message,
			"state": state,
			"extauthurl": ext_auth_url,
			"nonce": nonce,
		}));
		if !group.is_empty() {
			o.insert("group".into(), json!(group));
		}
		o.insert("avatar".into(), json!(avatar));
		Self::make(o)
	}

	/// Join or host result, carrying the session join payload.
	pub fn result_join_host(
		message: &str,
		state: &str,
		join: Map<String, Value>,
	) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "result",
			"message": message,
			"state": state,
			"join": join,
		})))
	}

	/// Result of a STARTTLS negotiation.
	pub fn result_start_tls(message: &str, start_tls: bool) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "result",
			"message": message,
			"state": "startTls",
			"startTls": start_tls,
		})))
	}

	/// Pushes updated session configuration.
	pub fn session_conf(config: Map<String, Value>) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "sessionconf",
			"config": config,
		})))
	}

	/// History is nearing the size limit.
	pub fn size_limit_warning(size: u64, max_size: u64) -> envelope::Result<Envelope> {
		Self::make(object(json!({
			"type": "sizelimit",
			"size": size,
			"maxSize": max_size,
		})))
	}

	/// Periodic status update with the current history size.
	pub fn status_update(size: u64) -> envelope::Result<Envelope> {
		Self::make(object(json!({ "type": "status", "size": size })))
	}
}

fn object(v: Value) -> Map<String, Value> {
	match v {
		Value::Object(o) => o,
		_ => Map::new(),
	}
}

fn keyed(kind: &str, message: &str, key: &str, params: Map<String, Value>) -> Map<String, Value> {
	let mut o = object(json!({
		"type": kind,
		"message": message,
		"T": key,
	}));
	if !params.is_empty() {
		o.insert("P".into(), Value::Object(params));
	}
	o
}
