//! Named set of client registrations, loadable from JSON configuration.

// self
use crate::{
	_prelude::*,
	auth::ClientName,
	client::{ClientRegistration, registration::RegistrationDocument},
	error::ConfigError,
};

/// Registrations indexed by logical client name.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry(HashMap<ClientName, Arc<ClientRegistration>>);
impl ClientRegistry {
	/// Parses a registry document of the form `{ "clients": [ ... ] }`.
	///
	/// Parse failures report the JSON path of the offending value.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
		#[derive(Deserialize)]
		#[serde(deny_unknown_fields)]
		struct Document {
			#[serde(default)]
			clients: Vec<RegistrationDocument>,
		}

		let mut deserializer = serde_json::Deserializer::from_slice(bytes);
		let doc: Document = serde_path_to_error::deserialize(&mut deserializer)?;
		let mut registry = Self::default();

		for entry in doc.clients {
			registry.insert(entry.into_registration()?)?;
		}

		Ok(registry)
	}

	/// Adds a registration; a name may only be registered once.
	pub fn insert(&mut self, registration: ClientRegistration) -> Result<(), ConfigError> {
		if self.0.contains_key(&registration.name) {
			return Err(ConfigError::DuplicateClient { name: registration.name.to_string() });
		}

		self.0.insert(registration.name.clone(), Arc::new(registration));

		Ok(())
	}

	/// Adds or replaces a registration.
	pub fn upsert(&mut self, registration: ClientRegistration) -> Option<Arc<ClientRegistration>> {
		self.0.insert(registration.name.clone(), Arc::new(registration))
	}

	/// Looks up a registration by name.
	pub fn get(&self, name: &str) -> Option<Arc<ClientRegistration>> {
		self.0.get(name).cloned()
	}

	/// Looks up a registration, failing with [`ConfigError::UnknownClient`].
	pub fn resolve(&self, name: &str) -> Result<Arc<ClientRegistration>, ConfigError> {
		self.get(name).ok_or_else(|| ConfigError::UnknownClient { name: name.to_owned() })
	}

	/// Registered names in sorted order.
	pub fn names(&self) -> Vec<&ClientName> {
		let mut names = self.0.keys().collect::<Vec<_>>();

		names.sort();

		names
	}

	/// Number of registrations.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no client is registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const DOC: &str = r#"{
		"clients": [
			{
				"name": "billing",
				"token_endpoint": "https://idp.example.com/token",
				"client_id": "billing-svc",
				"credential": { "method": "client_secret_basic", "client_secret": "b" }
			},
			{
				"name": "search",
				"token_endpoint": "https://idp.example.com/token",
				"client_id": "search-svc",
				"scope": ["search.read"]
			}
		]
	}"#;

	#[test]
	fn parses_registry_documents() {
		let registry =
			ClientRegistry::from_json_slice(DOC.as_bytes()).expect("Registry document should load.");

		assert_eq!(registry.len(), 2);
		assert_eq!(
			registry.names().into_iter().map(ClientName::as_str).collect::<Vec<_>>(),
			vec!["billing", "search"]
		);
		assert_eq!(
			registry.resolve("search").expect("Search client should resolve.").scope.normalized(),
			"search.read"
		);
		assert!(matches!(
			registry.resolve("missing"),
			Err(ConfigError::UnknownClient { name }) if name == "missing"
		));
	}

	#[test]
	fn parse_errors_carry_json_path() {
		let err = ClientRegistry::from_json_slice(
			br#"{ "clients": [ { "name": "bad name", "client_id": "x" } ] }"#,
		)
		.expect_err("Names with whitespace should be rejected.");

		match err {
			ConfigError::Parse { path, .. } => assert_eq!(path, "clients[0].name"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn duplicate_names_are_rejected() {
		let err = ClientRegistry::from_json_slice(
			br#"{ "clients": [
				{ "name": "a", "token_endpoint": "https://idp.example.com/t", "client_id": "1" },
				{ "name": "a", "token_endpoint": "https://idp.example.com/t", "client_id": "2" }
			] }"#,
		)
		.expect_err("Duplicate names should be rejected.");

		assert!(matches!(err, ConfigError::DuplicateClient { .. }));
	}
}
