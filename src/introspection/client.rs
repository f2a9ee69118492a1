//! HTTP client for RFC 7662 introspection endpoints.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	client::{ClientCredential, ClientRegistration},
	endpoint::EndpointRole,
	error::{ConfigError, EndpointError, FailureKind},
	http::{ResponseMetadataSlot, TokenHttpClient},
	introspection::IntrospectionResult,
	oauth::TransportErrorMapper,
	obs::{self, OpSpan, Operation, Outcome},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Introspection client specialized for the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestIntrospectionClient =
	IntrospectionClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Calls one client's introspection endpoint, authenticating the same way as its token
/// requests.
pub struct IntrospectionClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	registration: Arc<ClientRegistration>,
	endpoint: Url,
}
impl<C, M> IntrospectionClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client for `registration`, which must declare an introspection endpoint.
	pub fn for_registration(
		registration: impl Into<Arc<ClientRegistration>>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let registration = registration.into();
		let endpoint = registration.introspection_endpoint.clone().ok_or_else(|| {
			ConfigError::MissingIntrospectionEndpoint { name: registration.name.to_string() }
		})?;

		Ok(Self {
			http_client: http_client.into(),
			error_mapper: mapper.into(),
			registration,
			endpoint,
		})
	}

	/// Introspects `token`, optionally hinting its type (`access_token`, `refresh_token`).
	pub async fn introspect(
		&self,
		token: &str,
		token_type_hint: Option<&str>,
	) -> Result<IntrospectionResult> {
		const OP: Operation = Operation::Introspect;

		let span = OpSpan::new(OP, "introspect", self.registration.name.as_str());

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span.instrument(self.introspect_inner(token, token_type_hint)).await;

		match &result {
			Ok(_) => obs::record_outcome(OP, Outcome::Success),
			Err(_) => obs::record_outcome(OP, Outcome::Failure),
		}

		result
	}

	async fn introspect_inner(
		&self,
		token: &str,
		token_type_hint: Option<&str>,
	) -> Result<IntrospectionResult> {
		let role = EndpointRole::Introspection;
		let request = self.build_request(token, token_type_hint)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle
			.call(request)
			.await
			.map_err(|e| self.error_mapper.map_transport_error(role, meta.take().as_ref(), e))?;
		let status = response.status();

		if status.is_success() {
			return Ok(IntrospectionResult::from_slice(response.body())?);
		}

		let retry_after = meta.take().and_then(|m| m.retry_after);

		Err(role.failure(error_from_body(status.as_u16(), response.body()).with_retry_after(retry_after)))
	}

	fn build_request(&self, token: &str, token_type_hint: Option<&str>) -> Result<Request<Vec<u8>>> {
		let registration = &self.registration;
		let mut form = form_urlencoded::Serializer::new(String::new());
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json");

		form.append_pair("token", token);

		if let Some(hint) = token_type_hint {
			form.append_pair("token_type_hint", hint);
		}

		match &registration.credential {
			ClientCredential::ClientSecretBasic { client_secret } => {
				builder = builder.header(
					AUTHORIZATION,
					basic_authorization(&registration.client_id, client_secret.expose()),
				);
			},
			ClientCredential::ClientSecretPost { client_secret } => {
				form.append_pair("client_id", &registration.client_id);
				form.append_pair("client_secret", client_secret.expose());
			},
			ClientCredential::PrivateKeyJwt { assertion, assertion_type } => {
				form.append_pair("client_id", &registration.client_id);
				form.append_pair("client_assertion_type", assertion_type);
				form.append_pair("client_assertion", assertion.expose());
			},
			ClientCredential::None => {
				form.append_pair("client_id", &registration.client_id);
			},
		}

		builder
			.body(form.finish().into_bytes())
			.map_err(|e| ConfigError::http_request(e).into())
	}
}
#[cfg(feature = "reqwest")]
impl IntrospectionClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a reqwest-backed client with redirects disabled.
	pub fn new(registration: impl Into<Arc<ClientRegistration>>) -> Result<Self> {
		Ok(Self::for_registration(
			registration,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		)?)
	}
}
impl<C, M> Debug for IntrospectionClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IntrospectionClient")
			.field("client", &self.registration.name)
			.field("endpoint", &self.endpoint.as_str())
			.finish()
	}
}

// RFC 6749 §2.3.1: both halves are form-urlencoded before base64.
fn basic_authorization(client_id: &str, secret: &str) -> String {
	let id: String = form_urlencoded::byte_serialize(client_id.as_bytes()).collect();
	let secret: String = form_urlencoded::byte_serialize(secret.as_bytes()).collect();

	format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}

fn error_from_body(status: u16, body: &[u8]) -> EndpointError {
	#[derive(Deserialize)]
	struct ErrorBody {
		error: String,
		error_description: Option<String>,
	}

	match serde_json::from_slice::<ErrorBody>(body) {
		Ok(parsed) => EndpointError::oauth(parsed.error, parsed.error_description, Some(status)),
		Err(_) => EndpointError::new(
			FailureKind::classify(None, Some(status)),
			format!("Introspection endpoint returned HTTP {status}."),
		)
		.with_status(Some(status)),
	}
}
