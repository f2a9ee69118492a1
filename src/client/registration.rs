//! Validated client registrations and their builder.

// self
use crate::{
	_prelude::*,
	auth::{ClientName, ResourceId, ScopeSet},
	client::ClientCredential,
	error::ConfigError,
};

/// Everything the manager needs to acquire tokens for one logical client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientRegistration {
	/// Logical name callers use to request tokens.
	pub name: ClientName,
	/// Token endpoint URL.
	pub token_endpoint: Url,
	/// Optional RFC 7662 introspection endpoint.
	pub introspection_endpoint: Option<Url>,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client authentication method and material.
	pub credential: ClientCredential,
	/// Scope requested when the caller does not override it.
	pub scope: ScopeSet,
	/// Resource indicator requested when the caller does not override it.
	pub resource: Option<ResourceId>,
	/// Additional form parameters sent with every token request.
	pub extra_params: BTreeMap<String, String>,
}
impl ClientRegistration {
	/// Creates a builder for the provided logical name.
	pub fn builder(name: ClientName) -> ClientRegistrationBuilder {
		ClientRegistrationBuilder::new(name)
	}
}

/// Builder for [`ClientRegistration`] values.
#[derive(Clone, Debug)]
pub struct ClientRegistrationBuilder {
	name: ClientName,
	token_endpoint: Option<Url>,
	introspection_endpoint: Option<Url>,
	client_id: Option<String>,
	credential: ClientCredential,
	scope: ScopeSet,
	resource: Option<ResourceId>,
	extra_params: BTreeMap<String, String>,
	allow_insecure_http: bool,
}
impl ClientRegistrationBuilder {
	/// Creates a new builder seeded with the provided name.
	pub fn new(name: ClientName) -> Self {
		Self {
			name,
			token_endpoint: None,
			introspection_endpoint: None,
			client_id: None,
			credential: ClientCredential::None,
			scope: ScopeSet::default(),
			resource: None,
			extra_params: BTreeMap::new(),
			allow_insecure_http: false,
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the introspection endpoint.
	pub fn introspection_endpoint(mut self, url: Url) -> Self {
		self.introspection_endpoint = Some(url);

		self
	}

	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client authentication method.
	pub fn credential(mut self, credential: ClientCredential) -> Self {
		self.credential = credential;

		self
	}

	/// Sets the default scope.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the default resource indicator.
	pub fn resource(mut self, resource: ResourceId) -> Self {
		self.resource = Some(resource);

		self
	}

	/// Adds a form parameter sent with every token request.
	pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.insert(key.into(), value.into());

		self
	}

	/// Permits plain `http` endpoints (local development and tests only).
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting registration.
	pub fn build(self) -> Result<ClientRegistration, ConfigError> {
		let name = self.name;
		let token_endpoint = self
			.token_endpoint
			.ok_or_else(|| ConfigError::MissingTokenEndpoint { name: name.to_string() })?;
		let client_id = self
			.client_id
			.filter(|id| !id.trim().is_empty())
			.ok_or_else(|| ConfigError::MissingClientId { name: name.to_string() })?;

		validate_endpoint("token", &token_endpoint, self.allow_insecure_http)?;

		if let Some(introspection) = self.introspection_endpoint.as_ref() {
			validate_endpoint("introspection", introspection, self.allow_insecure_http)?;
		}

		Ok(ClientRegistration {
			name,
			token_endpoint,
			introspection_endpoint: self.introspection_endpoint,
			client_id,
			credential: self.credential,
			scope: self.scope,
			resource: self.resource,
			extra_params: self.extra_params,
		})
	}
}

/// Serialized registration as it appears in configuration documents.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RegistrationDocument {
	name: ClientName,
	token_endpoint: Option<String>,
	introspection_endpoint: Option<String>,
	client_id: Option<String>,
	#[serde(default)]
	credential: ClientCredential,
	#[serde(default)]
	scope: ScopeSet,
	resource: Option<ResourceId>,
	#[serde(default)]
	extra_params: BTreeMap<String, String>,
	#[serde(default)]
	allow_insecure_http: bool,
}
impl RegistrationDocument {
	pub(crate) fn into_registration(self) -> Result<ClientRegistration, ConfigError> {
		let mut builder = ClientRegistration::builder(self.name)
			.credential(self.credential)
			.scope(self.scope)
			.allow_insecure_http(self.allow_insecure_http);

		builder.extra_params = self.extra_params;
		builder.resource = self.resource;
		builder.client_id = self.client_id;

		if let Some(raw) = self.token_endpoint {
			builder = builder.token_endpoint(parse_endpoint(&raw)?);
		}
		if let Some(raw) = self.introspection_endpoint {
			builder = builder.introspection_endpoint(parse_endpoint(&raw)?);
		}

		builder.build()
	}
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { source })
}

fn validate_endpoint(name: &'static str, url: &Url, allow_http: bool) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if allow_http => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn name() -> ClientName {
		ClientName::new("inventory").expect("Client fixture should be valid.")
	}

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	#[test]
	fn builder_requires_endpoint_and_client_id() {
		let err = ClientRegistration::builder(name())
			.client_id("abc")
			.build()
			.expect_err("Token endpoint should be required.");

		assert!(matches!(err, ConfigError::MissingTokenEndpoint { .. }));

		let err = ClientRegistration::builder(name())
			.token_endpoint(url("https://idp.example.com/token"))
			.client_id("  ")
			.build()
			.expect_err("Blank client ids should be rejected.");

		assert!(matches!(err, ConfigError::MissingClientId { .. }));
	}

	#[test]
	fn builder_rejects_plain_http_unless_allowed() {
		let builder = ClientRegistration::builder(name())
			.token_endpoint(url("http://localhost:8080/token"))
			.client_id("abc");
		let err = builder.clone().build().expect_err("Plain HTTP should be rejected by default.");

		assert!(matches!(err, ConfigError::InsecureEndpoint { endpoint: "token", .. }));

		let registration = builder
			.allow_insecure_http(true)
			.build()
			.expect("Plain HTTP should be accepted when explicitly allowed.");

		assert_eq!(registration.token_endpoint.scheme(), "http");
	}

	#[test]
	fn document_converts_through_builder_validation() {
		let doc: RegistrationDocument = serde_json::from_str(
			r#"{
				"name": "inventory",
				"token_endpoint": "https://idp.example.com/token",
				"client_id": "inventory-svc",
				"credential": { "method": "client_secret_post", "client_secret": "s" },
				"scope": "inventory.read inventory.write",
				"resource": "https://inventory.example.com",
				"extra_params": { "audience": "inventory" }
			}"#,
		)
		.expect("Registration document should parse.");
		let registration = doc.into_registration().expect("Registration document should validate.");

		assert_eq!(registration.client_id, "inventory-svc");
		assert_eq!(registration.scope.len(), 2);
		assert_eq!(registration.extra_params.get("audience").map(String::as_str), Some("inventory"));
		assert_eq!(
			registration.resource.as_deref(),
			Some("https://inventory.example.com"),
		);
	}
}
