//! Configuration for the bidboard client.
//!
//! Configuration is read from a TOML file. Any string may reference the
//! environment with `${VAR}` or `${VAR:-default}`; references are resolved
//! before parsing and the result is validated as a whole.
//!
//! ```toml
//! [marketplace]
//! auction_duration_hours = 24
//!
//! [api]
//! base_url = "${BIDBOARD_API_URL:-http://localhost:8000/api}"
//! timeout_seconds = 10
//!
//! [storage]
//! primary = "file"
//! [storage.implementations.file]
//! storage_path = "./data/bidboard"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	#[serde(default)]
	pub marketplace: MarketplaceConfig,
	pub api: ApiConfig,
	#[serde(default)]
	pub storage: StorageConfig,
}

/// Marketplace rules that the backend does not dictate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
	/// Length of the auction window opened by `start_auction`.
	#[serde(default = "default_auction_duration_hours")]
	pub auction_duration_hours: u64,
}

impl Default for MarketplaceConfig {
	fn default() -> Self {
		Self {
			auction_duration_hours: default_auction_duration_hours(),
		}
	}
}

fn default_auction_duration_hours() -> u64 {
	24
}

/// Connection settings for the marketplace REST backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Base URL every endpoint path is appended to, e.g. `https://host/api`.
	pub base_url: String,
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	#[serde(default = "default_pool_idle_timeout_seconds")]
	pub pool_idle_timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
	10
}

fn default_pool_idle_timeout_seconds() -> u64 {
	90
}

/// Where the session and the offline ledger are kept.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub primary: String,
	/// Raw TOML table per implementation; each backend validates its own.
	pub implementations: HashMap<String, toml::Value>,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			primary: "memory".to_string(),
			implementations: HashMap::from([(
				"memory".to_string(),
				toml::Value::Table(toml::map::Map::new()),
			)]),
		}
	}
}

impl StorageConfig {
	/// Table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Replaces `${VAR}` and `${VAR:-default}` with values from the environment.
///
/// Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let name = &caps[1];
		match (std::env::var(name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		contents.parse()
	}

	pub fn auction_duration(&self) -> Duration {
		Duration::from_secs(self.marketplace.auction_duration_hours * 3600)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.api.timeout_seconds)
	}

	pub fn pool_idle_timeout(&self) -> Duration {
		Duration::from_secs(self.api.pool_idle_timeout_seconds)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let hours = self.marketplace.auction_duration_hours;
		if !(1..=720).contains(&hours) {
			return Err(ConfigError::Validation(format!(
				"marketplace.auction_duration_hours must be between 1 and 720, got {}",
				hours
			)));
		}

		let base_url = self.api.base_url.trim();
		if base_url.is_empty() {
			return Err(ConfigError::Validation("api.base_url cannot be empty".into()));
		}
		if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"api.base_url must start with http:// or https://, got '{}'",
				base_url
			)));
		}
		if self.api.timeout_seconds == 0 || self.api.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"api.timeout_seconds must be between 1 and 300".into(),
			));
		}
		if self.api.pool_idle_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"api.pool_idle_timeout_seconds must be greater than 0".into(),
			));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if self.storage.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		Ok(())
	}
}

/// Parses TOML after resolving environment references, then validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	const MINIMAL: &str = r#"
[api]
base_url = "http://localhost:8000/api"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("BIDBOARD_TEST_HOST", "localhost");
		std::env::set_var("BIDBOARD_TEST_PORT", "8000");

		let input = "base_url = \"http://${BIDBOARD_TEST_HOST}:${BIDBOARD_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "base_url = \"http://localhost:8000\"");

		std::env::remove_var("BIDBOARD_TEST_HOST");
		std::env::remove_var("BIDBOARD_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${BIDBOARD_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${BIDBOARD_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("BIDBOARD_MISSING_VAR"));
	}

	#[test]
	fn test_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.marketplace.auction_duration_hours, 24);
		assert_eq!(config.auction_duration(), Duration::from_secs(24 * 3600));
		assert_eq!(config.request_timeout(), Duration::from_secs(10));
		assert_eq!(config.pool_idle_timeout(), Duration::from_secs(90));
		assert_eq!(config.storage.primary, "memory");
		assert!(config.storage.primary_config().is_some());
	}

	#[test]
	fn test_full_config() {
		std::env::set_var("BIDBOARD_TEST_API_URL", "https://market.example.com/api");
		let config: Config = r#"
[marketplace]
auction_duration_hours = 48

[api]
base_url = "${BIDBOARD_TEST_API_URL}"
timeout_seconds = 5

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "/tmp/bidboard"
ttl_session = 86400
"#
		.parse()
		.unwrap();
		std::env::remove_var("BIDBOARD_TEST_API_URL");

		assert_eq!(config.api.base_url, "https://market.example.com/api");
		assert_eq!(config.request_timeout(), Duration::from_secs(5));
		assert_eq!(config.auction_duration(), Duration::from_secs(48 * 3600));
		assert_eq!(
			config
				.storage
				.primary_config()
				.and_then(|table| table.get("storage_path"))
				.and_then(|v| v.as_str()),
			Some("/tmp/bidboard")
		);
	}

	#[test]
	fn test_rejects_invalid_values() {
		let cases = [
			"[api]\nbase_url = \"ftp://host\"",
			"[api]\nbase_url = \"\"",
			"[api]\nbase_url = \"http://h\"\ntimeout_seconds = 0",
			"[marketplace]\nauction_duration_hours = 0\n[api]\nbase_url = \"http://h\"",
			"[marketplace]\nauction_duration_hours = 721\n[api]\nbase_url = \"http://h\"",
			"[api]\nbase_url = \"http://h\"\n[storage]\nprimary = \"file\"\n[storage.implementations.memory]",
		];
		for case in cases {
			assert!(
				matches!(case.parse::<Config>(), Err(ConfigError::Validation(_))),
				"accepted: {}",
				case
			);
		}
	}

	#[test]
	fn test_parse_error_is_reported() {
		assert!(matches!(
			"[api".parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
		// The api section is mandatory.
		assert!(matches!(
			"[marketplace]".parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(MINIMAL.as_bytes()).unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.api.base_url, "http://localhost:8000/api");

		let missing = Config::from_file("/definitely/not/here.toml").await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
