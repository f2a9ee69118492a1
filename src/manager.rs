//! Client-credentials token manager: cache lookup, coalesced acquisition and explicit
//! eviction, keyed per client, resource and scope.

pub mod metrics;
pub mod options;
pub mod settings;

pub use metrics::*;
pub use options::*;
pub use settings::*;

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	client::{ClientRegistration, ClientRegistry},
	endpoint::{TokenEndpointClient, TokenRequest},
	obs::{self, OpSpan, Operation, Outcome},
	store::{CacheKey, TokenCacheStore},
	sync::{FlightRole, RequestSynchronizer},
};
#[cfg(feature = "reqwest")]
use crate::{
	ext::{BearerSigner, RequestSigner},
	oauth::OAuth2TokenEndpoint,
	store::MemoryStore,
};

/// Hands out access tokens for registered clients, caching them until they near expiry.
///
/// Concurrent callers missing the cache for the same key share one token endpoint call and
/// observe the same outcome. Failed acquisitions are never cached, and an expired record is
/// never returned in place of a failure.
#[derive(Clone)]
pub struct ClientCredentialsTokenManager {
	endpoint: Arc<dyn TokenEndpointClient>,
	store: Arc<dyn TokenCacheStore>,
	registry: ClientRegistry,
	settings: ManagerSettings,
	synchronizer: Arc<RequestSynchronizer<CacheKey, TokenRecord>>,
	metrics: Arc<ManagerMetrics>,
}
impl ClientCredentialsTokenManager {
	/// Creates a manager with no registered clients and default settings.
	pub fn new(endpoint: Arc<dyn TokenEndpointClient>, store: Arc<dyn TokenCacheStore>) -> Self {
		Self {
			endpoint,
			store,
			registry: ClientRegistry::default(),
			settings: ManagerSettings::default(),
			synchronizer: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Registers a client, replacing any registration with the same name.
	pub fn with_registration(mut self, registration: ClientRegistration) -> Self {
		self.registry.upsert(registration);

		self
	}

	/// Replaces the whole registry.
	pub fn with_registry(mut self, registry: ClientRegistry) -> Self {
		self.registry = registry;

		self
	}

	/// Replaces the manager settings.
	pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
		self.settings = settings;

		self
	}

	/// Registered clients.
	pub fn registry(&self) -> &ClientRegistry {
		&self.registry
	}

	/// Active settings.
	pub fn settings(&self) -> &ManagerSettings {
		&self.settings
	}

	/// Counters shared by every clone of this manager.
	pub fn metrics(&self) -> &ManagerMetrics {
		&self.metrics
	}

	/// Cache key used for `client` under `options`.
	pub fn cache_key(&self, client: &str, options: &TokenRequestOptions) -> Result<CacheKey> {
		let registration = self.registry.resolve(client)?;

		Ok(self.key_for(&registration, options))
	}

	/// Returns a usable access token for `client`.
	///
	/// A cached record is reused while its expiry is later than now plus the configured
	/// clock skew, unless `options.force_refresh` is set. Otherwise the token endpoint is
	/// called once per key no matter how many callers are waiting. Cache read or write
	/// failures are logged and treated as a miss.
	pub async fn get_token(
		&self,
		client: &str,
		options: TokenRequestOptions,
	) -> Result<TokenRecord> {
		const OP: Operation = Operation::GetToken;

		let span = OpSpan::new(OP, "get_token", client);

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span.instrument(self.get_token_inner(client, options)).await;

		match &result {
			Ok(_) => obs::record_outcome(OP, Outcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(OP, Outcome::Failure);
			},
		}

		result
	}

	/// Evicts the cached token for `client` under `options`; returns `true` if one existed.
	///
	/// Unlike [`get_token`](Self::get_token), store failures surface as
	/// [`Error::CacheUnavailable`].
	pub async fn clear_token(&self, client: &str, options: &TokenRequestOptions) -> Result<bool> {
		const OP: Operation = Operation::ClearToken;

		let span = OpSpan::new(OP, "clear_token", client);

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let key = self.cache_key(client, options)?;

				Ok(self.store.remove(&key).await?)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OP, Outcome::Success),
			Err(_) => obs::record_outcome(OP, Outcome::Failure),
		}

		result
	}

	async fn get_token_inner(
		&self,
		client: &str,
		options: TokenRequestOptions,
	) -> Result<TokenRecord> {
		let registration = self.registry.resolve(client)?;
		let key = self.key_for(&registration, &options);
		let skew = self.settings.clock_skew;

		let cached = if options.force_refresh {
			None
		} else {
			cached_fresh(self.store.as_ref(), &key, skew).await
		};

		if let Some(record) = cached {
			self.metrics.record_cache_hit();
			obs::record_outcome(Operation::GetToken, Outcome::CacheHit);

			return Ok(record);
		}

		let acquisition = Acquisition {
			endpoint: self.endpoint.clone(),
			store: self.store.clone(),
			metrics: self.metrics.clone(),
			request: TokenRequest::for_registration(
				&registration,
				options.scope.as_ref(),
				options.resource.as_ref(),
			),
			key: key.clone(),
			reuse_skew: (!options.force_refresh).then_some(skew),
		};
		let (role, result) =
			self.synchronizer.synchronize_with_role(key, move || acquisition.run()).await;

		if role == FlightRole::Follower {
			self.metrics.record_coalesced();
			obs::record_outcome(Operation::GetToken, Outcome::Coalesced);
		}

		result
	}

	fn key_for(&self, registration: &ClientRegistration, options: &TokenRequestOptions) -> CacheKey {
		let resource = options.resource.clone().or_else(|| registration.resource.clone());

		CacheKey::new(registration.name.clone())
			.with_namespace(self.settings.cache_key_prefix.clone())
			.with_resource(resource)
			.with_scope(options.scope.as_ref())
	}
}
#[cfg(feature = "reqwest")]
impl ClientCredentialsTokenManager {
	/// Creates a manager over the default reqwest token endpoint and an in-memory cache.
	pub fn in_memory() -> Result<Self> {
		Ok(Self::new(Arc::new(OAuth2TokenEndpoint::new()?), Arc::new(MemoryStore::default())))
	}

	/// Sends `request` with a bearer token for `client`.
	///
	/// When the target answers `401 Unauthorized` and the request can be cloned, the token
	/// is refreshed and the request is sent once more; the second response is returned as is.
	pub async fn send_authorized(
		&self,
		client: &str,
		options: TokenRequestOptions,
		request: reqwest::RequestBuilder,
	) -> Result<reqwest::Response> {
		const OP: Operation = Operation::SendAuthorized;

		let span = OpSpan::new(OP, "send_authorized", client);

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let retry = request.try_clone();
				let record = self.get_token(client, options.clone()).await?;
				let response = send_signed(request, &record).await?;

				if response.status() != reqwest::StatusCode::UNAUTHORIZED {
					return Ok(response);
				}

				let Some(retry) = retry else {
					return Ok(response);
				};
				let record = self.get_token(client, options.force_refresh()).await?;

				send_signed(retry, &record).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OP, Outcome::Success),
			Err(_) => obs::record_outcome(OP, Outcome::Failure),
		}

		result
	}
}
impl Debug for ClientCredentialsTokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsTokenManager")
			.field("clients", &self.registry.names())
			.field("settings", &self.settings)
			.field("in_flight", &self.synchronizer.in_flight())
			.finish()
	}
}

// Owned state of one flight; it must outlive any single caller.
struct Acquisition {
	endpoint: Arc<dyn TokenEndpointClient>,
	store: Arc<dyn TokenCacheStore>,
	metrics: Arc<ManagerMetrics>,
	request: TokenRequest,
	key: CacheKey,
	reuse_skew: Option<Duration>,
}
impl Acquisition {
	async fn run(self) -> Result<TokenRecord> {
		// A flight that finished between this caller's lookup and its own start already
		// stored a fresh record.
		let reused = match self.reuse_skew {
			Some(skew) => cached_fresh(self.store.as_ref(), &self.key, skew).await,
			None => None,
		};

		if let Some(record) = reused {
			return Ok(record);
		}

		self.metrics.record_acquisition();

		let issued_at = OffsetDateTime::now_utc();
		let grant = self.endpoint.request_token(&self.request).await?;
		let ttl = grant.expires_in;
		let record = grant.into_record(issued_at, self.request.scope.clone())?;

		if let Err(e) = self.store.put(&self.key, record.clone(), ttl).await {
			obs::warn_cache_failure(Operation::GetToken, "put", &e);
		}

		Ok(record)
	}
}

async fn cached_fresh(
	store: &dyn TokenCacheStore,
	key: &CacheKey,
	skew: Duration,
) -> Option<TokenRecord> {
	match store.get(key).await {
		Ok(record) => record.filter(|record| record.is_fresh_at(OffsetDateTime::now_utc(), skew)),
		Err(e) => {
			obs::warn_cache_failure(Operation::GetToken, "get", &e);

			None
		},
	}
}

#[cfg(feature = "reqwest")]
async fn send_signed(
	request: reqwest::RequestBuilder,
	record: &TokenRecord,
) -> Result<reqwest::Response> {
	BearerSigner
		.attach_token(request, record)?
		.send()
		.await
		.map_err(|e| Error::SendFailed(Arc::new(e)))
}
