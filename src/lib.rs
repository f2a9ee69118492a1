//! OAuth 2.0 client-credentials token manager with per-client token caching, singleflight
//! acquisition against token endpoints and RFC 7662 introspection normalization.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod ext;
pub mod http;
pub mod introspection;
pub mod manager;
pub mod oauth;
pub mod obs;
pub mod store;
pub mod sync;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ClientRegistration,
		endpoint::TokenEndpointClient,
		http::ReqwestHttpClient,
		manager::ClientCredentialsTokenManager,
		oauth::{OAuth2TokenEndpoint, ReqwestTransportErrorMapper},
		store::{MemoryStore, TokenCacheStore},
	};

	/// Token endpoint type alias used by reqwest-backed integration tests.
	pub type ReqwestTestEndpoint =
		OAuth2TokenEndpoint<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`ClientCredentialsTokenManager`] backed by an in-memory store and the
	/// reqwest token endpoint used across integration tests.
	pub fn build_reqwest_test_manager(
		registration: ClientRegistration,
	) -> (ClientCredentialsTokenManager, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenCacheStore> = store_backend.clone();
		let endpoint: Arc<dyn TokenEndpointClient> = Arc::new(
			ReqwestTestEndpoint::with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper),
		);
		let manager =
			ClientCredentialsTokenManager::new(endpoint, store).with_registration(registration);

		(manager, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
