//! Session configuration.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hooks::{FixedResetPolicy, HistoryHooks};
use crate::history::SessionHistory;

/// Default hard history limit: 15 MiB.
pub const DEFAULT_SIZE_LIMIT: u64 = 15 * 1024 * 1024;

/// Default depth of the session command queue.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Size policy and queue settings for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
	/// Hard history size limit in bytes, 0 for unlimited.
	pub size_limit: u64,
	/// Growth above the last reset size at which to autoreset, 0 to disable.
	pub autoreset_threshold: u64,
	/// Capacity of the session service command queue.
	pub mailbox_capacity: usize,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			size_limit: DEFAULT_SIZE_LIMIT,
			autoreset_threshold: 0,
			mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
		}
	}
}

impl SessionConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&text)?;
		tracing::debug!(path = %path.display(), ?config, "session config loaded");
		Ok(config)
	}

	/// Checks values that parse but cannot be used.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.mailbox_capacity == 0 {
			return Err(ConfigError::Invalid("mailbox_capacity must be > 0".into()));
		}
		Ok(())
	}

	/// Renders the configuration back to TOML.
	pub fn to_toml_string(&self) -> Result<String, ConfigError> {
		toml::to_string(self).map_err(|err| ConfigError::Invalid(err.to_string()))
	}

	/// Autoreset policy described by this configuration.
	#[must_use]
	pub fn reset_policy(&self) -> FixedResetPolicy {
		FixedResetPolicy(self.autoreset_threshold)
	}

	/// Builds a history for session `id` using this configuration.
	pub fn build_history(&self, id: impl Into<String>, hooks: impl HistoryHooks + 'static) -> SessionHistory {
		SessionHistory::new(id)
			.with_size_limit(self.size_limit)
			.with_policy(Arc::new(self.reset_policy()))
			.with_hooks(hooks)
	}
}
