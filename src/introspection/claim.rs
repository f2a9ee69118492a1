//! Flattening of introspection payloads into `(type, value, issuer)` claims.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::MalformedResponseError};

/// Claim type names used by RFC 7662 responses.
pub mod claim_type {
	/// Token state flag; read directly and never emitted as a claim.
	pub const ACTIVE: &str = "active";
	/// Space-delimited (or array) scope list.
	pub const SCOPE: &str = "scope";
	/// Client the token was issued to.
	pub const CLIENT_ID: &str = "client_id";
	/// Human-readable resource owner identifier.
	pub const USERNAME: &str = "username";
	/// Token type, e.g. `Bearer`.
	pub const TOKEN_TYPE: &str = "token_type";
	/// Expiry, seconds since the Unix epoch.
	pub const EXPIRATION: &str = "exp";
	/// Issue time, seconds since the Unix epoch.
	pub const ISSUED_AT: &str = "iat";
	/// Not-before time, seconds since the Unix epoch.
	pub const NOT_BEFORE: &str = "nbf";
	/// Subject of the token.
	pub const SUBJECT: &str = "sub";
	/// Intended audience(s).
	pub const AUDIENCE: &str = "aud";
	/// Issuer of the token.
	pub const ISSUER: &str = "iss";
	/// Token identifier.
	pub const JWT_ID: &str = "jti";
}

/// One normalized claim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
	/// Claim type (the payload member name).
	pub claim_type: String,
	/// Claim value in textual form.
	pub value: String,
	/// Issuer taken from the payload's `iss` member.
	pub issuer: Option<String>,
}
impl Claim {
	fn new(claim_type: &str, value: String, issuer: Option<&str>) -> Self {
		Self { claim_type: claim_type.to_owned(), value, issuer: issuer.map(str::to_owned) }
	}
}

/// Normalizes an introspection payload.
///
/// Fails with [`MalformedResponseError::NotAnObject`] unless `payload` is a JSON object.
pub fn normalize(payload: &Value) -> Result<Vec<Claim>, MalformedResponseError> {
	match payload {
		Value::Object(members) => Ok(normalize_object(members)),
		other => Err(MalformedResponseError::NotAnObject {
			found: MalformedResponseError::json_type(other),
		}),
	}
}

/// Normalizes the members of an introspection object.
///
/// Every member except `active` becomes zero or more claims typed by the member name; arrays
/// yield one claim per element and `null` yields none. `scope` claims come last and follow
/// the scope compatibility rule: an array contributes its elements verbatim, anything else
/// is split on ASCII spaces with empty segments dropped.
pub fn normalize_object(members: &Map<String, Value>) -> Vec<Claim> {
	let issuer = members.get(claim_type::ISSUER).and_then(scalar_text);
	let issuer = issuer.as_deref();
	let mut claims = Vec::with_capacity(members.len());

	for (name, value) in members {
		if name == claim_type::ACTIVE || name == claim_type::SCOPE {
			continue;
		}

		match value {
			Value::Array(items) => claims.extend(
				items.iter().filter_map(element_text).map(|text| Claim::new(name, text, issuer)),
			),
			other =>
				if let Some(text) = element_text(other) {
					claims.push(Claim::new(name, text, issuer));
				},
		}
	}

	match members.get(claim_type::SCOPE) {
		Some(Value::Array(items)) => claims.extend(
			items
				.iter()
				.filter_map(element_text)
				.map(|text| Claim::new(claim_type::SCOPE, text, issuer)),
		),
		Some(Value::Null) | None => {},
		Some(other) => {
			let joined = element_text(other).unwrap_or_default();

			claims.extend(
				joined
					.split(' ')
					.filter(|segment| !segment.is_empty())
					.map(|segment| Claim::new(claim_type::SCOPE, segment.to_owned(), issuer)),
			);
		},
	}

	claims
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

fn element_text(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::Array(_) | Value::Object(_) => Some(value.to_string()),
		scalar => scalar_text(scalar),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn values<'a>(claims: &'a [Claim], kind: &str) -> Vec<&'a str> {
		claims.iter().filter(|c| c.claim_type == kind).map(|c| c.value.as_str()).collect()
	}

	#[test]
	fn scope_arrays_keep_elements_verbatim() {
		let claims = normalize(&json!({ "scope": ["b a", "c", " d "] }))
			.expect("Object payloads should normalize.");

		assert_eq!(values(&claims, claim_type::SCOPE), vec!["b a", "c", " d "]);
	}

	#[test]
	fn scope_strings_split_on_spaces() {
		let claims = normalize(&json!({ "scope": "  a  b " })).expect("Payload should normalize.");

		assert_eq!(values(&claims, claim_type::SCOPE), vec!["a", "b"]);

		let claims = normalize(&json!({ "scope": null })).expect("Payload should normalize.");

		assert!(values(&claims, claim_type::SCOPE).is_empty());
	}

	#[test]
	fn issuer_is_attached_to_every_claim() {
		let claims = normalize(&json!({
			"iss": "https://idp.example.com",
			"sub": "svc",
			"aud": ["a", "b"],
			"scope": "read",
			"active": true,
		}))
		.expect("Payload should normalize.");

		assert!(claims.iter().all(|c| c.issuer.as_deref() == Some("https://idp.example.com")));
		assert_eq!(values(&claims, claim_type::AUDIENCE), vec!["a", "b"]);
		assert_eq!(values(&claims, claim_type::ISSUER), vec!["https://idp.example.com"]);
		assert!(values(&claims, claim_type::ACTIVE).is_empty());
		assert_eq!(
			claims.last().map(|c| c.claim_type.as_str()),
			Some(claim_type::SCOPE),
			"Scope claims are emitted after every other member."
		);
	}

	#[test]
	fn scalars_and_objects_are_stringified() {
		let claims = normalize(&json!({
			"exp": 1700000000,
			"ext": { "tier": "gold" },
			"flag": false,
			"none": null,
		}))
		.expect("Payload should normalize.");

		assert_eq!(values(&claims, "exp"), vec!["1700000000"]);
		assert_eq!(values(&claims, "ext"), vec![r#"{"tier":"gold"}"#]);
		assert_eq!(values(&claims, "flag"), vec!["false"]);
		assert!(values(&claims, "none").is_empty());
		assert!(claims.iter().all(|c| c.issuer.is_none()));
	}

	#[test]
	fn non_objects_are_rejected() {
		let err = normalize(&json!(["active"])).expect_err("Arrays are not introspection payloads.");

		assert!(matches!(err, MalformedResponseError::NotAnObject { found: "array" }));
	}
}
