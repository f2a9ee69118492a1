//! Typed view over a normalized introspection response.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::MalformedResponseError,
	introspection::claim::{self, Claim, claim_type},
};

/// Immutable result of an RFC 7662 introspection call.
///
/// Singular accessors return the first claim of their type; [`scopes`](Self::scopes) and
/// [`audiences`](Self::audiences) return every value in payload order. Time claims are
/// parsed when the result is built, so a malformed `exp`, `iat` or `nbf` fails construction.
#[derive(Clone, Debug, PartialEq)]
pub struct IntrospectionResult {
	active: bool,
	claims: Vec<Claim>,
	expiration: Option<OffsetDateTime>,
	issued_at: Option<OffsetDateTime>,
	not_before: Option<OffsetDateTime>,
	members: Map<String, Value>,
}
impl IntrospectionResult {
	/// Builds a result from a parsed JSON payload.
	pub fn from_json(payload: Value) -> Result<Self, MalformedResponseError> {
		let members = match payload {
			Value::Object(members) => members,
			other =>
				return Err(MalformedResponseError::NotAnObject {
					found: MalformedResponseError::json_type(&other),
				}),
		};
		let active = match members.get(claim_type::ACTIVE) {
			None => false,
			Some(Value::Bool(flag)) => *flag,
			Some(other) =>
				return Err(MalformedResponseError::InvalidActive {
					found: MalformedResponseError::json_type(other),
				}),
		};
		let claims = claim::normalize_object(&members);
		let expiration = parse_time(&claims, claim_type::EXPIRATION)?;
		let issued_at = parse_time(&claims, claim_type::ISSUED_AT)?;
		let not_before = parse_time(&claims, claim_type::NOT_BEFORE)?;

		Ok(Self { active, claims, expiration, issued_at, not_before, members })
	}

	/// Parses and builds a result from a raw response body.
	pub fn from_slice(body: &[u8]) -> Result<Self, MalformedResponseError> {
		Self::from_json(serde_json::from_slice(body)?)
	}

	/// Whether the authorization server considers the token active.
	pub fn active(&self) -> bool {
		self.active
	}

	/// All normalized claims in emission order.
	pub fn claims(&self) -> &[Claim] {
		&self.claims
	}

	/// Values of every claim of `kind`, in order.
	pub fn values_of<'s>(&'s self, kind: &str) -> impl Iterator<Item = &'s str> {
		self.claims.iter().filter(move |c| c.claim_type == kind).map(|c| c.value.as_str())
	}

	/// First value of a claim of `kind`.
	pub fn first_value(&self, kind: &str) -> Option<&str> {
		self.values_of(kind).next()
	}

	/// Granted scopes, empty when the payload carried none.
	pub fn scopes(&self) -> Vec<&str> {
		self.values_of(claim_type::SCOPE).collect()
	}

	/// Returns `true` if `scope` was granted.
	pub fn has_scope(&self, scope: &str) -> bool {
		self.values_of(claim_type::SCOPE).any(|granted| granted == scope)
	}

	/// Every audience value.
	pub fn audiences(&self) -> Vec<&str> {
		self.values_of(claim_type::AUDIENCE).collect()
	}

	/// `client_id` member.
	pub fn client_id(&self) -> Option<&str> {
		self.first_value(claim_type::CLIENT_ID)
	}

	/// `username` member.
	pub fn user_name(&self) -> Option<&str> {
		self.first_value(claim_type::USERNAME)
	}

	/// `token_type` member.
	pub fn token_type(&self) -> Option<&str> {
		self.first_value(claim_type::TOKEN_TYPE)
	}

	/// `sub` member.
	pub fn subject(&self) -> Option<&str> {
		self.first_value(claim_type::SUBJECT)
	}

	/// `iss` member.
	pub fn issuer(&self) -> Option<&str> {
		self.first_value(claim_type::ISSUER)
	}

	/// `jti` member.
	pub fn jwt_id(&self) -> Option<&str> {
		self.first_value(claim_type::JWT_ID)
	}

	/// `exp` member.
	pub fn expiration(&self) -> Option<OffsetDateTime> {
		self.expiration
	}

	/// `iat` member.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		self.issued_at
	}

	/// `nbf` member.
	pub fn not_before(&self) -> Option<OffsetDateTime> {
		self.not_before
	}

	/// Returns `true` once `instant` reaches the `exp` claim. Tokens without `exp` never
	/// expire by this check.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expiration.is_some_and(|exp| instant >= exp)
	}

	/// Raw JSON value of any member, including extension fields.
	pub fn member(&self, name: &str) -> Option<&Value> {
		self.members.get(name)
	}
}
impl FromStr for IntrospectionResult {
	type Err = MalformedResponseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_slice(s.as_bytes())
	}
}

fn parse_time(claims: &[Claim], kind: &str) -> Result<Option<OffsetDateTime>, MalformedResponseError> {
	let Some(raw) = claims.iter().find(|c| c.claim_type == kind).map(|c| c.value.as_str()) else {
		return Ok(None);
	};
	let seconds = raw.parse::<i64>().map_err(|_| MalformedResponseError::NonNumericTime {
		claim: kind.to_owned(),
		value: raw.to_owned(),
	})?;

	OffsetDateTime::from_unix_timestamp(seconds)
		.map(Some)
		.map_err(|_| MalformedResponseError::TimeOutOfRange { claim: kind.to_owned(), value: seconds })
}
