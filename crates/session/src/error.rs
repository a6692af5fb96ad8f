//! Error types for session configuration and the session service.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or field types.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value is syntactically valid but unusable.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Errors returned by a [`SessionHandle`](crate::SessionHandle).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
	/// The session service has shut down.
	#[error("session closed")]
	Closed,
}
