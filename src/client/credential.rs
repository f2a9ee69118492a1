//! Client authentication methods presented to the token and introspection endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// `client_assertion_type` value for JWT bearer assertions (RFC 7523).
pub const JWT_BEARER_ASSERTION_TYPE: &str =
	"urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// How a client authenticates to its token endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClientCredential {
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic {
		/// Shared client secret.
		client_secret: TokenSecret,
	},
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost {
		/// Shared client secret.
		client_secret: TokenSecret,
	},
	/// Pre-signed client assertion sent as `client_assertion`.
	PrivateKeyJwt {
		/// Signed assertion value.
		assertion: TokenSecret,
		/// Assertion type URI.
		#[serde(default = "default_assertion_type")]
		assertion_type: String,
	},
	/// Public client identified by `client_id` only.
	#[default]
	None,
}
impl ClientCredential {
	/// Shorthand for [`ClientCredential::ClientSecretBasic`].
	pub fn secret_basic(secret: impl Into<String>) -> Self {
		Self::ClientSecretBasic { client_secret: TokenSecret::new(secret) }
	}

	/// Shorthand for [`ClientCredential::ClientSecretPost`].
	pub fn secret_post(secret: impl Into<String>) -> Self {
		Self::ClientSecretPost { client_secret: TokenSecret::new(secret) }
	}

	/// Shorthand for a JWT bearer [`ClientCredential::PrivateKeyJwt`].
	pub fn jwt_assertion(assertion: impl Into<String>) -> Self {
		Self::PrivateKeyJwt {
			assertion: TokenSecret::new(assertion),
			assertion_type: default_assertion_type(),
		}
	}

	/// Client secret, for the secret-based methods.
	pub fn client_secret(&self) -> Option<&TokenSecret> {
		match self {
			Self::ClientSecretBasic { client_secret } | Self::ClientSecretPost { client_secret } =>
				Some(client_secret),
			_ => None,
		}
	}

	/// Stable label used in logs.
	pub fn method(&self) -> &'static str {
		match self {
			Self::ClientSecretBasic { .. } => "client_secret_basic",
			Self::ClientSecretPost { .. } => "client_secret_post",
			Self::PrivateKeyJwt { .. } => "private_key_jwt",
			Self::None => "none",
		}
	}
}

fn default_assertion_type() -> String {
	JWT_BEARER_ASSERTION_TYPE.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credentials_deserialize_by_method_tag() {
		let basic: ClientCredential =
			serde_json::from_str(r#"{"method":"client_secret_basic","client_secret":"s3cr3t"}"#)
				.expect("Basic credential should parse.");
		let jwt: ClientCredential =
			serde_json::from_str(r#"{"method":"private_key_jwt","assertion":"eyJ"}"#)
				.expect("Assertion credential should parse.");

		assert_eq!(basic, ClientCredential::secret_basic("s3cr3t"));
		assert_eq!(basic.client_secret().map(TokenSecret::expose), Some("s3cr3t"));
		assert_eq!(jwt, ClientCredential::jwt_assertion("eyJ"));
		assert_eq!(jwt.method(), "private_key_jwt");
		assert!(jwt.client_secret().is_none());
	}

	#[test]
	fn debug_output_hides_secrets() {
		let rendered = format!("{:?}", ClientCredential::secret_post("hunter2"));

		assert!(!rendered.contains("hunter2"));
	}
}
