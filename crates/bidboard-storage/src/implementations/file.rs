//! File-backed storage.
//!
//! Every key is one file under `storage_path`. Each file starts with a small
//! fixed header carrying an optional expiry, followed by the raw value.
//! Writes go through a temporary file and a rename.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use bidboard_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/bidboard";
const EXTENSION: &str = "entry";

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// Entry header, 16 bytes:
/// magic `BDBD`, version (u16 LE), two reserved bytes, expiry (u64 LE unix
/// seconds, 0 = never).
#[derive(Debug, Clone, Copy, PartialEq)]
struct EntryHeader {
	expires_at: u64,
}

impl EntryHeader {
	const MAGIC: [u8; 4] = *b"BDBD";
	const VERSION: u16 = 1;
	const SIZE: usize = 16;

	fn with_ttl(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			unix_now().saturating_add(ttl.as_secs().max(1))
		};
		Self { expires_at }
	}

	fn encode(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(&Self::MAGIC);
		bytes[4..6].copy_from_slice(&Self::VERSION.to_le_bytes());
		bytes[8..16].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes
	}

	fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE || bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("not a bidboard storage entry".into()));
		}
		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"unsupported entry version {}",
				version
			)));
		}
		let mut expires = [0u8; 8];
		expires.copy_from_slice(&bytes[8..16]);
		Ok(Self {
			expires_at: u64::from_le_bytes(expires),
		})
	}

	fn is_expired(&self, now: u64) -> bool {
		self.expires_at != 0 && now >= self.expires_at
	}
}

/// Default TTLs per namespace, read from `ttl_<namespace>` keys.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	fn from_config(config: &toml::Value) -> Self {
		let ttls = StorageKey::all()
			.filter_map(|key| {
				config
					.get(format!("ttl_{}", key.as_str()))
					.and_then(toml::Value::as_integer)
					.and_then(|secs| u64::try_from(secs).ok())
					.map(|secs| (key, Duration::from_secs(secs)))
			})
			.collect();
		Self { ttls }
	}

	/// TTL for a `"namespace:id"` key; zero when unconfigured.
	fn for_key(&self, key: &str) -> Duration {
		key.split(':')
			.next()
			.and_then(|namespace| namespace.parse::<StorageKey>().ok())
			.and_then(|namespace| self.ttls.get(&namespace).copied())
			.unwrap_or(Duration::ZERO)
	}
}

pub struct FileStorage {
	base_path: PathBuf,
	ttl_config: TtlConfig,
}

impl FileStorage {
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	/// File for a key. Bytes outside `[A-Za-z0-9_-]` are written as `%XX`,
	/// so distinct keys never share a file and no key can leave `base_path`.
	fn path_for(&self, key: &str) -> PathBuf {
		let mut file_name = String::with_capacity(key.len() + EXTENSION.len() + 1);
		for byte in key.bytes() {
			match byte {
				b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => file_name.push(byte as char),
				other => {
					let _ = write!(file_name, "%{:02X}", other);
				},
			}
		}
		file_name.push('.');
		file_name.push_str(EXTENSION);
		self.base_path.join(file_name)
	}

	async fn read_entry(&self, key: &str) -> Result<Option<(EntryHeader, Vec<u8>)>, StorageError> {
		let data = match fs::read(self.path_for(key)).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(backend_error(e)),
		};
		let header = EntryHeader::decode(&data)?;
		if header.is_expired(unix_now()) {
			return Ok(None);
		}
		Ok(Some((header, data[EntryHeader::SIZE..].to_vec())))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.read_entry(key)
			.await?
			.map(|(_, value)| value)
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(backend_error)?;

		let ttl = ttl.unwrap_or_else(|| self.ttl_config.for_key(key));
		let mut contents = Vec::with_capacity(EntryHeader::SIZE + value.len());
		contents.extend_from_slice(&EntryHeader::with_ttl(ttl).encode());
		contents.extend_from_slice(&value);

		let path = self.path_for(key);
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, contents).await.map_err(backend_error)?;
		fs::rename(&temp_path, &path).await.map_err(backend_error)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.path_for(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.read_entry(key).await?.is_some())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(backend_error(e)),
		};

		let now = unix_now();
		let mut removed = 0;
		while let Some(entry) = entries.next_entry().await.map_err(backend_error)? {
			let path = entry.path();
			if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
				continue;
			}
			let expired = match fs::read(&path).await {
				Ok(data) => EntryHeader::decode(&data).is_ok_and(|h| h.is_expired(now)),
				Err(e) => {
					tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
					false
				},
			};
			if !expired {
				continue;
			}
			match fs::remove_file(&path).await {
				Ok(()) => removed += 1,
				Err(e) => {
					tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired entry")
				},
			}
		}
		Ok(removed)
	}
}

/// Accepts `storage_path` and one `ttl_<namespace>` per storage namespace.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let mut optional = vec![Field::new("storage_path", FieldType::String)];
		optional.extend(StorageKey::all().map(|key| {
			Field::new(
				format!("ttl_{}", key.as_str()),
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			)
		}));
		Schema::new(vec![], optional).validate(config)
	}
}

/// Configuration:
/// - `storage_path`: directory for entries (default `./data/bidboard`)
/// - `ttl_<namespace>`: default TTL in seconds for that namespace (0 = never)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(format!("file: {}", e)))?;

	let storage_path = config
		.get("storage_path")
		.and_then(toml::Value::as_str)
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		TtlConfig::from_config(config),
	)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[tokio::test]
	async fn test_persists_across_instances() {
		let dir = tempdir().unwrap();
		let first = FileStorage::new(dir.path().to_path_buf(), TtlConfig::default());
		first
			.set_bytes("orders:42", b"{\"id\":\"42\"}".to_vec(), None)
			.await
			.unwrap();

		let second = FileStorage::new(dir.path().to_path_buf(), TtlConfig::default());
		assert_eq!(second.get_bytes("orders:42").await.unwrap(), b"{\"id\":\"42\"}");
		assert!(second.exists("orders:42").await.unwrap());

		second.delete("orders:42").await.unwrap();
		assert!(matches!(
			first.get_bytes("orders:42").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_keys_are_sanitized() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf(), TtlConfig::default());
		storage
			.set_bytes("orders:../../escape", b"x".to_vec(), None)
			.await
			.unwrap();
		assert!(dir
			.path()
			.join("orders%3A%2E%2E%2F%2E%2E%2Fescape.entry")
			.exists());
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[tokio::test]
	async fn test_similar_keys_do_not_collide() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf(), TtlConfig::default());
		let keys = [
			"users:ana.b@example.com",
			"users:ana_b@example_com",
			"users:ana%2Eb@example.com",
			"users/ana.b@example.com",
		];
		for key in keys {
			storage.set_bytes(key, key.as_bytes().to_vec(), None).await.unwrap();
		}
		for key in keys {
			assert_eq!(storage.get_bytes(key).await.unwrap(), key.as_bytes());
		}
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), keys.len());
	}

	#[tokio::test]
	async fn test_expired_entries() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf(), TtlConfig::default());

		// Write an entry whose expiry is already in the past.
		let mut contents = EntryHeader { expires_at: 1 }.encode().to_vec();
		contents.extend_from_slice(b"stale");
		std::fs::write(storage.path_for("session:current"), contents).unwrap();
		storage.set_bytes("orders:1", b"fresh".to_vec(), None).await.unwrap();

		assert!(!storage.exists("session:current").await.unwrap());
		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
		assert!(storage.exists("orders:1").await.unwrap());
	}

	#[test]
	fn test_ttl_config_by_namespace() {
		let config: toml::Value = toml::from_str("ttl_session = 3600").unwrap();
		let ttls = TtlConfig::from_config(&config);
		assert_eq!(ttls.for_key("session:current"), Duration::from_secs(3600));
		assert_eq!(ttls.for_key("orders:1"), Duration::ZERO);
	}

	#[test]
	fn test_header_rejects_foreign_files() {
		assert!(EntryHeader::decode(b"hello world, not a header").is_err());
		let header = EntryHeader::with_ttl(Duration::ZERO);
		assert_eq!(EntryHeader::decode(&header.encode()).unwrap(), header);
		assert!(!header.is_expired(u64::MAX));
	}

	#[test]
	fn test_factory_validates_before_building() {
		let config: toml::Value = toml::from_str("storage_path = 5\nttl_orders = 60").unwrap();
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(ref message)) if message.starts_with("file:")
		));
	}

	#[test]
	fn test_schema_rejects_negative_ttl() {
		let config: toml::Value = toml::from_str("ttl_orders = -1").unwrap();
		assert!(FileStorageSchema.validate(&config).is_err());
	}
}
