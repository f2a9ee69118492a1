//! The token endpoint seam: one client-credentials grant in, one issued token out.

// self
use crate::{
	_prelude::*,
	auth::{ResourceId, ScopeSet, TokenRecord, TokenRecordBuilderError, TokenSecret},
	client::{ClientCredential, ClientRegistration},
	error::{ConfigError, EndpointError, MalformedResponseError},
};

/// Boxed future returned by [`TokenEndpointClient`].
pub type EndpointFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Performs client-credentials grants against a token endpoint.
///
/// Implementations hold no per-request state; the manager decides when to call them and
/// caches what they return. Endpoint-reported failures should surface as
/// [`Error::TokenAcquisitionFailed`] and unparsable responses as
/// [`Error::MalformedResponse`].
pub trait TokenEndpointClient
where
	Self: Send + Sync,
{
	/// Requests a token for `request`.
	fn request_token<'a>(&'a self, request: &'a TokenRequest) -> EndpointFuture<'a, TokenGrant>;
}

/// Which endpoint a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointRole {
	/// Token endpoint (client-credentials grant).
	Token,
	/// RFC 7662 introspection endpoint.
	Introspection,
}
impl EndpointRole {
	/// Stable label used in logs and messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			EndpointRole::Token => "token",
			EndpointRole::Introspection => "introspection",
		}
	}

	/// Wraps an endpoint failure in the error variant for this role.
	pub fn failure(self, error: EndpointError) -> Error {
		match self {
			EndpointRole::Token => Error::TokenAcquisitionFailed(error),
			EndpointRole::Introspection => Error::IntrospectionFailed(error),
		}
	}
}
impl Display for EndpointRole {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Inputs of a single client-credentials grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
	/// Token endpoint URL.
	pub token_endpoint: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client authentication method and material.
	pub credential: ClientCredential,
	/// Requested scope; empty means the `scope` parameter is omitted.
	pub scope: ScopeSet,
	/// RFC 8707 resource indicator.
	pub resource: Option<ResourceId>,
	/// Additional form parameters.
	pub extra_params: BTreeMap<String, String>,
}
impl TokenRequest {
	/// Builds a request from a registration, applying per-call scope and resource overrides.
	pub fn for_registration(
		registration: &ClientRegistration,
		scope: Option<&ScopeSet>,
		resource: Option<&ResourceId>,
	) -> Self {
		Self {
			token_endpoint: registration.token_endpoint.clone(),
			client_id: registration.client_id.clone(),
			credential: registration.credential.clone(),
			scope: scope.cloned().unwrap_or_else(|| registration.scope.clone()),
			resource: resource.cloned().or_else(|| registration.resource.clone()),
			extra_params: registration.extra_params.clone(),
		}
	}
}

/// Successful token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Reported token type, if any.
	pub token_type: Option<String>,
	/// Lifetime reported by `expires_in`.
	pub expires_in: Duration,
	/// Refresh token, if issued.
	pub refresh_token: Option<TokenSecret>,
}
impl TokenGrant {
	/// Converts the grant into a cache record issued at `issued_at`.
	pub fn into_record(self, issued_at: OffsetDateTime, scope: ScopeSet) -> Result<TokenRecord> {
		let mut builder = TokenRecord::builder()
			.access_token(self.access_token.expose())
			.scope(scope)
			.issued_at(issued_at)
			.expires_in(self.expires_in);

		if let Some(kind) = self.token_type {
			builder = builder.token_type(kind);
		}
		if let Some(refresh) = self.refresh_token {
			builder = builder.refresh_token(refresh.expose());
		}

		builder.build().map_err(|e| match e {
			TokenRecordBuilderError::ExpiryOutOfRange =>
				MalformedResponseError::ExpiresInOutOfRange.into(),
			e => ConfigError::from(e).into(),
		})
	}
}
