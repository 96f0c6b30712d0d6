//! Configuration for adbfs
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (TOML, e.g. ~/.config/adbfs/config.toml)
//! 3. Environment variables (ADBFS_SERVER, ANDROID_SERIAL, ADBFS_LOG)
//! 4. CLI flags (highest priority)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::transport::DEFAULT_SERVER;

/// Environment variable overriding the host daemon address
pub const ENV_SERVER: &str = "ADBFS_SERVER";
/// Environment variable selecting the device, as understood by adb itself
pub const ENV_SERIAL: &str = "ANDROID_SERIAL";
/// Environment variable overriding the default log level
pub const ENV_LOG: &str = "ADBFS_LOG";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// CONNECTION
	// ========================================================================
	/// Host daemon address (host:port)
	pub server: String,

	/// Device serial; `None` picks the only attached device
	pub serial: Option<String>,

	// ========================================================================
	// OUTPUT & LOGGING
	// ========================================================================
	/// Default log level when RUST_LOG is not set (trace, debug, info, warn, error)
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config { server: DEFAULT_SERVER.to_string(), serial: None, log_level: "info".to_string() }
	}
}

impl Config {
	/// Load a TOML config file on top of the defaults
	pub fn load(path: &Path) -> Result<Config, ConfigError> {
		let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
			path: path.display().to_string(),
			source: e,
		})?;
		toml::from_str(&text).map_err(|e| ConfigError::Parse {
			path: path.display().to_string(),
			message: e.to_string(),
		})
	}

	/// Default config file location, if a home directory is known
	pub fn default_path() -> Option<PathBuf> {
		std::env::var_os("HOME")
			.map(|home| PathBuf::from(home).join(".config").join("adbfs").join("config.toml"))
	}

	/// Apply overrides from the process environment
	pub fn apply_env(&mut self) {
		self.apply_env_from(|key| std::env::var(key).ok());
	}

	/// Apply overrides from an arbitrary variable lookup
	pub fn apply_env_from<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(server) = lookup(ENV_SERVER).filter(|s| !s.is_empty()) {
			self.server = server;
		}
		if let Some(serial) = lookup(ENV_SERIAL).filter(|s| !s.is_empty()) {
			self.serial = Some(serial);
		}
		if let Some(level) = lookup(ENV_LOG).filter(|s| !s.is_empty()) {
			self.log_level = level;
		}
	}

	/// Reject values that cannot work
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.server.trim().is_empty() {
			return Err(ConfigError::Invalid { message: "server address is empty".to_string() });
		}
		if let Some(serial) = &self.serial {
			if serial.trim().is_empty() {
				return Err(ConfigError::Invalid { message: "serial is empty".to_string() });
			}
		}
		match self.log_level.as_str() {
			"trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
			other => Err(ConfigError::Invalid { message: format!("unknown log level {:?}", other) }),
		}
	}
}


// vim: ts=4
