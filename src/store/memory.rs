//! Thread-safe in-process [`TokenCacheStore`] with per-entry TTL eviction.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{CacheKey, StoreError, StoreFuture, TokenCacheStore},
};

type EntryMap = Arc<RwLock<HashMap<CacheKey, Entry>>>;

#[derive(Clone, Debug)]
struct Entry {
	record: TokenRecord,
	evict_at: OffsetDateTime,
}

/// In-process cache backend used by default and in tests.
///
/// Entries past their TTL are dropped lazily on read, or eagerly through
/// [`purge_expired`](Self::purge_expired).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(EntryMap);
impl MemoryStore {
	/// Number of entries currently held, including ones past their TTL.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry whose TTL elapsed before now; returns how many were removed.
	pub fn purge_expired(&self) -> usize {
		self.purge_expired_at(OffsetDateTime::now_utc())
	}

	/// Drops every entry whose TTL elapsed at `instant`.
	pub fn purge_expired_at(&self, instant: OffsetDateTime) -> usize {
		let mut guard = self.0.write();
		let before = guard.len();

		guard.retain(|_, entry| entry.evict_at > instant);

		before - guard.len()
	}

	fn get_now(map: &EntryMap, key: &CacheKey, instant: OffsetDateTime) -> Option<TokenRecord> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if entry.evict_at > instant => return Some(entry.record.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		// A concurrent put may have replaced the entry between the two locks.
		if guard.get(key).is_some_and(|entry| entry.evict_at <= instant) {
			guard.remove(key);
		}

		guard.get(key).map(|entry| entry.record.clone())
	}

	fn put_now(map: &EntryMap, key: &CacheKey, record: TokenRecord, ttl: Duration) {
		let mut guard = map.write();

		if ttl <= Duration::ZERO {
			guard.remove(key);

			return;
		}

		let evict_at = OffsetDateTime::now_utc().saturating_add(ttl);

		guard.insert(key.clone(), Entry { record, evict_at });
	}
}
impl TokenCacheStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn put<'a>(
		&'a self,
		key: &'a CacheKey,
		record: TokenRecord,
		ttl: Duration,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::put_now(&self.0, key, record, ttl);

			Ok::<_, StoreError>(())
		})
	}

	fn remove<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.write().remove(key).is_some()) })
	}
}
