//! Tessera admin tool.
//!
//! Builds server command envelopes for session administration (kick, ban,
//! mute, announce) and decodes server replies, so scripts and bots can speak
//! the command protocol without linking the session crates.

use std::num::NonZeroU8;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tessera_proto::{ControlCommand, ControlReply, Envelope, MessageKind};
use tessera_session::SessionConfig;
use tracing::debug;

/// Admin tool command line arguments.
#[derive(Parser, Debug)]
#[command(name = "tessera-admin")]
#[command(about = "Build tessera server commands and decode server replies")]
struct Args {
	/// Session configuration file
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Kick a user, optionally banning them
	Kick {
		/// Context id of the user (1-255)
		target: NonZeroU8,
		/// Also ban the user
		#[arg(long)]
		ban: bool,
	},
	/// Announce the session at a listing server
	Announce {
		/// Listing server URL
		url: String,
		/// List privately
		#[arg(long)]
		private: bool,
	},
	/// Remove a session announcement
	Unannounce {
		/// Listing server URL
		url: String,
	},
	/// Remove a ban list entry
	Unban {
		/// Ban entry id
		id: u32,
	},
	/// Mute or unmute a user
	Mute {
		/// Context id of the user
		target: u8,
		/// Unmute instead of mute
		#[arg(long)]
		unmute: bool,
	},
	/// Build an arbitrary command
	Raw {
		/// Command name
		cmd: String,
		/// Positional argument as JSON (bare words are taken as strings)
		#[arg(long = "arg", value_name = "JSON")]
		args: Vec<String>,
		/// Keyword argument as KEY=JSON
		#[arg(long = "kwarg", value_name = "KEY=JSON")]
		kwargs: Vec<String>,
	},
	/// Decode a server reply given as JSON text
	Decode {
		/// Reply JSON
		json: String,
	},
	/// Print the effective session configuration
	Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let output = run(&args)?;
	println!("{output}");
	Ok(())
}

fn run(args: &Args) -> Result<String, Box<dyn std::error::Error>> {
	let env = match &args.command {
		Command::Kick { target, ban } => ControlCommand::kick(*target, *ban)?,
		Command::Announce { url, private } => ControlCommand::announce(url, *private)?,
		Command::Unannounce { url } => ControlCommand::unannounce(url)?,
		Command::Unban { id } => ControlCommand::unban(*id)?,
		Command::Mute { target, unmute } => ControlCommand::mute(*target, !*unmute)?,
		Command::Raw { cmd, args, kwargs } => {
			let args = args.iter().map(String::as_str).map(parse_value).collect();
			let kwargs = kwargs
				.iter()
				.map(String::as_str)
				.map(parse_kwarg)
				.collect::<Result<Map<String, Value>, String>>()?;
			ControlCommand::make(cmd.clone(), args, kwargs)?
		}
		Command::Decode { json } => return decode(json),
		Command::Config => {
			let config = match &args.config {
				Some(path) => SessionConfig::load(path)?,
				None => SessionConfig::default(),
			};
			return Ok(config.to_toml_string()?);
		}
	};

	debug!(len = env.length(), "command encoded");
	Ok(format!(
		"{}\n{}",
		String::from_utf8_lossy(env.payload()),
		hex(&env.to_bytes())
	))
}

fn decode(json: &str) -> Result<String, Box<dyn std::error::Error>> {
	let env = Envelope::new(MessageKind::SERVER_COMMAND, 0, json.as_bytes().to_vec())?;
	let reply = ControlReply::from_envelope(&env);
	Ok(format!("{:?}: {}", reply.kind, reply.message))
}

fn parse_value(s: &str) -> Value {
	serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn parse_kwarg(kv: &str) -> Result<(String, Value), String> {
	let (key, value) = kv
		.split_once('=')
		.ok_or_else(|| format!("expected KEY=JSON, got {kv:?}"))?;
	if key.is_empty() {
		return Err(format!("empty keyword in {kv:?}"));
	}
	Ok((key.to_string(), parse_value(value)))
}

fn hex(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn run_args(argv: &[&str]) -> String {
		let args = Args::try_parse_from(std::iter::once("tessera-admin").chain(argv.iter().copied())).unwrap();
		run(&args).unwrap()
	}

	#[test]
	fn kick_prints_json_and_frame() {
		let out = run_args(&["kick", "5", "--ban"]);
		let json = r#"{"cmd":"kick-user","args":[5],"kwargs":{"ban":true}}"#;
		let mut lines = out.lines();
		assert_eq!(lines.next(), Some(json));
		let frame = lines.next().unwrap();
		assert_eq!(&frame[..8], format!("{:04x}0000", json.len()));
	}

	#[test]
	fn targets_are_range_checked() {
		assert!(Args::try_parse_from(["tessera-admin", "kick", "0"]).is_err());
		assert!(Args::try_parse_from(["tessera-admin", "kick", "256"]).is_err());
		assert!(Args::try_parse_from(["tessera-admin", "mute", "256"]).is_err());
	}

	#[test]
	fn mute_and_unmute() {
		assert!(run_args(&["mute", "4"]).starts_with(r#"{"cmd":"mute","args":[4,true]}"#));
		assert!(run_args(&["mute", "4", "--unmute"]).starts_with(r#"{"cmd":"mute","args":[4,false]}"#));
	}

	#[test]
	fn raw_parses_json_and_bare_words() {
		let out = run_args(&["raw", "op", "--arg", "3", "--arg", "alice", "--kwarg", "reason=\"spam\""]);
		assert!(out.starts_with(r#"{"cmd":"op","args":[3,"alice"],"kwargs":{"reason":"spam"}}"#));
	}

	#[test]
	fn bad_kwarg_is_an_error() {
		let args = Args::try_parse_from(["tessera-admin", "raw", "op", "--kwarg", "novalue"]).unwrap();
		assert!(run(&args).is_err());
	}

	#[test]
	fn decode_reply() {
		assert_eq!(
			run_args(&["decode", r#"{"type":"error","message":"no such user"}"#]),
			"Error: no such user"
		);
		assert_eq!(run_args(&["decode", "not json"]), "Unknown: ");
	}

	#[test]
	fn default_config_is_printed() {
		let out = run_args(&["config"]);
		assert!(out.contains("size_limit = 15728640"));
		assert!(out.contains("mailbox_capacity = 256"));
	}
}
