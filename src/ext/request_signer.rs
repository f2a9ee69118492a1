//! Request signing contracts that let callers attach manager-issued tokens to arbitrary
//! HTTP clients.

// self
use crate::auth::TokenRecord;
#[cfg(feature = "reqwest")]
use crate::{_prelude::*, error::ConfigError};

/// Describes how to attach a [`TokenRecord`] to an outbound request without constraining
/// the HTTP client type.
pub trait RequestSigner<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects authorization derived from `record`.
	fn attach_token(&self, request: Request, record: &TokenRecord) -> Result<Request, Error>;
}

/// Sets the `Authorization` header of reqwest requests from the record's token type.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
#[cfg(feature = "reqwest")]
impl RequestSigner<reqwest::RequestBuilder, Error> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		record: &TokenRecord,
	) -> Result<reqwest::RequestBuilder> {
		let mut value = reqwest::header::HeaderValue::from_str(&record.authorization_value())
			.map_err(ConfigError::http_request)?;

		value.set_sensitive(true);

		Ok(request.header(reqwest::header::AUTHORIZATION, value))
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	fn record(token: &str) -> TokenRecord {
		TokenRecord::builder()
			.access_token(token)
			.token_type("bearer")
			.issued_at(OffsetDateTime::now_utc())
			.expires_in(Duration::minutes(5))
			.build()
			.expect("Record fixture should build.")
	}

	#[test]
	fn bearer_signer_sets_sensitive_authorization_header() {
		let client = ReqwestClient::new();
		let request = BearerSigner
			.attach_token(client.get("https://api.example.com/"), &record("abc"))
			.expect("Token should be a valid header value.")
			.build()
			.expect("Request should build.");
		let header = request
			.headers()
			.get(reqwest::header::AUTHORIZATION)
			.expect("Authorization header should be set.");

		assert_eq!(header, "Bearer abc");
		assert!(header.is_sensitive());
	}

	#[test]
	fn tokens_with_control_characters_are_rejected() {
		let client = ReqwestClient::new();

		assert!(matches!(
			BearerSigner.attach_token(client.get("https://api.example.com/"), &record("a\nb")),
			Err(Error::Config(ConfigError::HttpRequest { .. }))
		));
	}
}
