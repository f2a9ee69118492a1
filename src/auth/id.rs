//! Strongly typed names for registered clients and downstream resources.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $max:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Maximum accepted length in bytes.
			pub const MAX_LEN: usize = $max;

			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, Self::MAX_LEN)?;

				Ok(Self(view.to_owned()))
			}

			/// Returns the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, Self::MAX_LEN)?;

				Ok(Self(value))
			}
		}
		impl TryFrom<&str> for $name {
			type Error = IdentifierError;

			fn try_from(value: &str) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (client, resource).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (client, resource).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (client, resource).
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

def_id! { ClientName, "Logical name of a registered client-credentials client.", "Client", 128 }
def_id! {
	ResourceId,
	"Resource indicator (RFC 8707) that partitions tokens issued to the same client.",
	"Resource",
	2048
}

fn validate_view(kind: &'static str, view: &str, max: usize) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(ClientName::new(" billing").is_err(), "Leading whitespace must be rejected.");
		assert!(ClientName::new("billing ").is_err(), "Trailing whitespace must be rejected.");
		assert!(ClientName::new("").is_err());
		assert!(ResourceId::new("urn:api with space").is_err());

		let client = ClientName::new("billing-api").expect("Client fixture should be valid.");

		assert_eq!(client.as_str(), "billing-api");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let client: ClientName =
			serde_json::from_str("\"orders\"").expect("Client should deserialize successfully.");

		assert_eq!(client.as_ref(), "orders");
		assert!(serde_json::from_str::<ClientName>("\"with space\"").is_err());
		assert_eq!(
			serde_json::to_string(&client).expect("Client should serialize successfully."),
			"\"orders\""
		);
	}

	#[test]
	fn length_limits_differ_per_kind() {
		let exact = "a".repeat(ClientName::MAX_LEN);

		ClientName::new(&exact).expect("Exact length should succeed.");

		assert!(ClientName::new("a".repeat(ClientName::MAX_LEN + 1)).is_err());

		let resource = format!("https://api.example.com/{}", "r".repeat(512));

		ResourceId::new(&resource).expect("Long resource URIs should be accepted.");
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ClientName, u8> = HashMap::from_iter([(
			ClientName::new("catalog").expect("Client used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("catalog"), Some(&7));
	}
}
