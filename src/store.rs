//! Cache contracts and built-in store implementations for client-credentials tokens.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ClientName, ResourceId, ScopeSet, TokenRecord},
};

/// Boxed future returned by [`TokenCacheStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value cache of token records, shared by every caller of the manager.
///
/// Implementations only need per-entry atomicity: a reader racing a writer must observe the
/// previous record or the new one, never a partial write. Writes to the same key are already
/// serialized by the manager's request synchronizer.
pub trait TokenCacheStore
where
	Self: Send + Sync,
{
	/// Fetches the record cached under `key`, if present and not evicted.
	fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Stores `record` under `key`, replacing any previous entry, for at most `ttl`.
	fn put<'a>(
		&'a self,
		key: &'a CacheKey,
		record: TokenRecord,
		ttl: Duration,
	) -> StoreFuture<'a, ()>;

	/// Evicts the entry under `key`; returns `true` if one existed.
	fn remove<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`TokenCacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Token cache serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Token cache backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Identity of a cached token: the client plus the discriminators that change what the
/// endpoint would issue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
	/// Optional namespace shared by every key of one manager.
	pub namespace: Option<String>,
	/// Logical client name.
	pub client: ClientName,
	/// Resource indicator requested for the token.
	pub resource: Option<ResourceId>,
	/// Fingerprint of an explicit scope override; `None` means the client's default scope.
	pub scope_fingerprint: Option<String>,
}
impl CacheKey {
	/// Builds a key for the client's default token.
	pub fn new(client: ClientName) -> Self {
		Self { namespace: None, client, resource: None, scope_fingerprint: None }
	}

	/// Partitions the key by resource indicator.
	pub fn with_resource(mut self, resource: Option<ResourceId>) -> Self {
		self.resource = resource;

		self
	}

	/// Partitions the key by scope override; an empty set counts as no override.
	pub fn with_scope(mut self, scope: Option<&ScopeSet>) -> Self {
		self.scope_fingerprint = scope.filter(|s| !s.is_empty()).map(ScopeSet::fingerprint);

		self
	}

	/// Places the key inside a namespace.
	pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
		self.namespace = namespace.filter(|ns| !ns.is_empty());

		self
	}

	/// Opaque string form used by backends keyed by text.
	///
	/// Components are form-urlencoded and joined with `::`, so distinct keys never render
	/// to the same string.
	pub fn render(&self) -> String {
		let mut parts = Vec::with_capacity(4);

		if let Some(namespace) = &self.namespace {
			parts.push(encode(namespace));
		}

		parts.push(encode(self.client.as_str()));
		parts.push(self.resource.as_deref().map(encode).unwrap_or_default());
		parts.push(self.scope_fingerprint.as_deref().map(encode).unwrap_or_default());

		parts.join("::")
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.render())
	}
}

fn encode(component: &str) -> String {
	form_urlencoded::byte_serialize(component.as_bytes()).collect()
}
