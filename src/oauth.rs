//! [`TokenEndpointClient`] implementation built on the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, HttpClientError, RequestTokenError, Scope, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::ClientCredential,
	endpoint::{EndpointFuture, EndpointRole, TokenEndpointClient, TokenGrant, TokenRequest},
	error::{ConfigError, EndpointError, FailureKind, MalformedResponseError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport while calling `role`.
	fn map_transport_error(
		&self,
		role: EndpointRole,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		role: EndpointRole,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(role, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::http_request(inner).into(),
			HttpClientError::Io(inner) => role.failure(EndpointError::transport(inner)),
			HttpClientError::Other(message) => role.failure(
				EndpointError::new(
					FailureKind::Transport,
					format!("HTTP client error occurred while calling the {role} endpoint: {message}."),
				)
				.with_status(meta_status(meta)),
			),
			_ => role.failure(
				EndpointError::new(
					FailureKind::Transport,
					format!("HTTP client error occurred while calling the {role} endpoint."),
				)
				.with_status(meta_status(meta)),
			),
		}
	}
}

/// Token endpoint client that speaks the standard client-credentials grant.
///
/// A fresh `oauth2` client is configured per request from the [`TokenRequest`], so one
/// instance serves every registration of a manager.
pub struct OAuth2TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> OAuth2TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an endpoint client over the caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), error_mapper: mapper.into() }
	}

	/// Underlying transport, shared with other clients such as introspection.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2TokenEndpoint<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an endpoint client backed by a redirect-free reqwest client.
	pub fn new() -> Result<Self> {
		Ok(Self::with_http_client(ReqwestHttpClient::new()?, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Clone for OAuth2TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { http_client: self.http_client.clone(), error_mapper: self.error_mapper.clone() }
	}
}
impl<C, M> Debug for OAuth2TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2TokenEndpoint").finish_non_exhaustive()
	}
}
impl<C, M> TokenEndpointClient for OAuth2TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn request_token<'a>(&'a self, request: &'a TokenRequest) -> EndpointFuture<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut oauth_client = BasicClient::new(ClientId::new(request.client_id.clone()))
				.set_token_uri(TokenUrl::from_url(request.token_endpoint.clone()));

			match &request.credential {
				ClientCredential::ClientSecretBasic { client_secret } => {
					oauth_client = oauth_client
						.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()));
				},
				ClientCredential::ClientSecretPost { client_secret } => {
					oauth_client = oauth_client
						.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
						.set_auth_type(AuthType::RequestBody);
				},
				ClientCredential::PrivateKeyJwt { .. } | ClientCredential::None => {
					oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
				},
			}

			let mut exchange = oauth_client.exchange_client_credentials();

			for scope in request.scope.iter() {
				exchange = exchange.add_scope(Scope::new(scope.to_owned()));
			}
			if let Some(resource) = &request.resource {
				exchange = exchange.add_extra_param("resource", resource.as_str());
			}
			if let ClientCredential::PrivateKeyJwt { assertion, assertion_type } =
				&request.credential
			{
				exchange = exchange
					.add_extra_param("client_assertion_type", assertion_type.as_str())
					.add_extra_param("client_assertion", assertion.expose());
			}
			for (key, value) in &request.extra_params {
				exchange = exchange.add_extra_param(key.as_str(), value.as_str());
			}

			let response = exchange.request_async(&instrumented).await.map_err(|err| {
				map_request_error(meta.take(), err, self.error_mapper.as_ref())
			})?;

			map_token_response(response)
		})
	}
}

fn map_token_response(response: BasicTokenResponse) -> Result<TokenGrant> {
	let expires_in =
		response.expires_in().ok_or(MalformedResponseError::MissingExpiresIn)?.as_secs();
	let expires_in =
		i64::try_from(expires_in).map_err(|_| MalformedResponseError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(MalformedResponseError::NonPositiveExpiresIn.into());
	}

	Ok(TokenGrant {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		token_type: Some(response.token_type().as_ref().to_owned()),
		expires_in: Duration::seconds(expires_in),
		refresh_token: response.refresh_token().map(|token| TokenSecret::new(token.secret())),
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();
	let status = meta_status(meta_ref);

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(EndpointRole::Token, meta_ref, error),
		// Error statuses with a body that is not an OAuth error document (gateway pages, etc.).
		RequestTokenError::Parse(error, _body) if status.is_some_and(|code| code >= 400) =>
			EndpointRole::Token.failure(
				EndpointError::new(
					FailureKind::classify(None, status),
					"Token endpoint returned an error status with an unrecognized body.",
				)
				.with_status(status)
				.with_retry_after(meta_retry_after(meta_ref))
				.with_source(error.into_inner()),
			),
		RequestTokenError::Parse(error, _body) => {
			let path = error.path().to_string();

			MalformedResponseError::TokenResponse {
				path,
				source: Arc::new(error.into_inner()),
				status,
			}
			.into()
		},
		RequestTokenError::Other(message) => EndpointRole::Token.failure(
			EndpointError::new(
				FailureKind::classify(None, status),
				format!("Token endpoint returned an unexpected response: {message}."),
			)
			.with_status(status)
			.with_retry_after(meta_retry_after(meta_ref)),
		),
	}
}

fn map_server_response_error(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	EndpointRole::Token.failure(
		EndpointError::oauth(
			response.error().as_ref(),
			response.error_description().cloned(),
			meta_status(meta),
		)
		.with_retry_after(meta_retry_after(meta)),
	)
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(role: EndpointRole, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	let status = meta_status(meta).or_else(|| err.status().map(|code| code.as_u16()));

	if err.is_timeout() {
		return role.failure(
			EndpointError::new(
				FailureKind::Transient,
				format!("Request timed out while calling the {role} endpoint."),
			)
			.with_status(status)
			.with_retry_after(meta_retry_after(meta))
			.with_source(err),
		);
	}

	role.failure(EndpointError::transport(err).with_status(status))
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn token_response(json: &str) -> BasicTokenResponse {
		serde_json::from_str(json).expect("Token response fixture should parse.")
	}

	#[test]
	fn token_responses_require_positive_lifetime() {
		let grant = map_token_response(token_response(
			r#"{"access_token":"abc","token_type":"bearer","expires_in":3600,"refresh_token":"r"}"#,
		))
		.expect("Complete responses should map.");

		assert_eq!(grant.access_token.expose(), "abc");
		assert_eq!(grant.expires_in, Duration::hours(1));
		assert_eq!(grant.token_type.as_deref(), Some("bearer"));
		assert_eq!(grant.refresh_token.as_ref().map(TokenSecret::expose), Some("r"));

		let missing =
			map_token_response(token_response(r#"{"access_token":"abc","token_type":"bearer"}"#))
				.expect_err("Responses without expires_in should fail.");

		assert!(matches!(
			missing,
			Error::MalformedResponse(MalformedResponseError::MissingExpiresIn)
		));

		let zero = map_token_response(token_response(
			r#"{"access_token":"abc","token_type":"bearer","expires_in":0}"#,
		))
		.expect_err("Zero lifetimes should fail.");

		assert!(matches!(
			zero,
			Error::MalformedResponse(MalformedResponseError::NonPositiveExpiresIn)
		));
	}

	#[test]
	fn server_errors_keep_oauth_fields_and_retry_hint() {
		let response: BasicErrorResponse = serde_json::from_str(
			r#"{"error":"invalid_client","error_description":"unknown client"}"#,
		)
		.expect("Error response fixture should parse.");
		let meta = ResponseMetadata { status: Some(401), retry_after: Some(Duration::SECOND) };
		let err = map_server_response_error(response, Some(&meta));
		let details = err.endpoint_error().expect("Server errors should carry endpoint details.");

		assert!(matches!(err, Error::TokenAcquisitionFailed(_)));
		assert_eq!(details.kind, FailureKind::InvalidClient);
		assert_eq!(details.error.as_deref(), Some("invalid_client"));
		assert_eq!(details.error_description.as_deref(), Some("unknown client"));
		assert_eq!(details.status, Some(401));
		assert_eq!(details.retry_after, Some(Duration::SECOND));
	}
}
