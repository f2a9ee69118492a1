//! JSON-file-backed [`TokenCacheStore`] for CLIs and single-host services that want tokens to
//! survive restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{CacheKey, StoreError, StoreFuture, TokenCacheStore},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FileEntry {
	record: TokenRecord,
	evict_at: OffsetDateTime,
}

/// Persists cached records to a JSON file after each mutation.
///
/// Entries are keyed by [`CacheKey::render`], so the file stays readable and stable across
/// crate versions that keep the rendering unchanged.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, FileEntry>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	///
	/// Entries whose TTL already elapsed are discarded while loading.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let mut snapshot = Self::load_snapshot(&path)?;
		let now = OffsetDateTime::now_utc();

		snapshot.retain(|_, entry| entry.evict_at > now);

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, FileEntry>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let entries: Vec<(String, FileEntry)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	// Writes to a sibling temp file and renames it over the target so readers of the file
	// never see a truncated snapshot.
	fn persist_locked(&self, contents: &HashMap<String, FileEntry>) -> Result<(), StoreError> {
		let mut snapshot: Vec<_> = contents.iter().collect();

		snapshot.sort_by(|(a, _), (b, _)| a.cmp(b));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenCacheStore for FileStore {
	fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let rendered = key.render();
			let now = OffsetDateTime::now_utc();

			Ok(self
				.inner
				.read()
				.get(&rendered)
				.filter(|entry| entry.evict_at > now)
				.map(|entry| entry.record.clone()))
		})
	}

	fn put<'a>(
		&'a self,
		key: &'a CacheKey,
		record: TokenRecord,
		ttl: Duration,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let rendered = key.render();
			let mut guard = self.inner.write();

			if ttl <= Duration::ZERO {
				guard.remove(&rendered);
			} else {
				let evict_at = OffsetDateTime::now_utc().saturating_add(ttl);

				guard.insert(rendered, FileEntry { record, evict_at });
			}

			self.persist_locked(&guard)
		})
	}

	fn remove<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let removed = guard.remove(&key.render()).is_some();

			if removed {
				self.persist_locked(&guard)?;
			}

			Ok(removed)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::{ClientName, ResourceId};

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"oauth2_token_manager_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn fixture() -> (CacheKey, TokenRecord) {
		let client = ClientName::new("reporting").expect("Failed to build client fixture.");
		let resource =
			ResourceId::new("https://api.example.com").expect("Failed to build resource fixture.");
		let record = TokenRecord::builder()
			.access_token("access-token")
			.token_type("Bearer")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test record.");

		(CacheKey::new(client).with_resource(Some(resource)), record)
	}

	#[test]
	fn records_survive_reopen() {
		let path = temp_path("reopen");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let (key, record) = fixture();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.put(&key, record.clone(), Duration::hours(1)))
			.expect("Failed to save fixture record to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get(&key))
			.expect("Failed to fetch fixture record from file store.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched, record);
		assert!(
			rt.block_on(reopened.remove(&key)).expect("Failed to remove fixture record."),
			"Remove should report the evicted entry."
		);
		assert!(rt.block_on(reopened.get(&key)).expect("Lookup should succeed.").is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_a_serialization_error() {
		let path = temp_path("corrupt");

		fs::write(&path, b"{not json").expect("Failed to write corrupt snapshot.");

		assert!(matches!(FileStore::open(&path), Err(StoreError::Serialization { .. })));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn huge_ttls_saturate_and_persist() {
		let path = temp_path("huge_ttl");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let (key, record) = fixture();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.put(&key, record.clone(), Duration::MAX))
			.expect("Saturated TTLs should still persist.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(
			rt.block_on(reopened.get(&key)).expect("Lookup should succeed."),
			Some(record)
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
