//! Manager-wide settings loaded from code or JSON.

// self
use crate::{_prelude::*, error::ConfigError};

/// Manager-wide tuning shared by every client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerSettings {
	/// Margin subtracted from a record's expiry when deciding whether it is still usable.
	#[serde(rename = "clock_skew_secs", with = "whole_seconds")]
	pub clock_skew: Duration,
	/// Namespace prepended to every cache key, for stores shared between deployments.
	pub cache_key_prefix: Option<String>,
}
impl ManagerSettings {
	/// Default [`clock_skew`](Self::clock_skew).
	pub const DEFAULT_CLOCK_SKEW: Duration = Duration::seconds(60);

	/// Parses settings from JSON, reporting the path of the first invalid field.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);

		Ok(serde_path_to_error::deserialize(&mut de)?)
	}

	/// Overrides the clock skew; negative values clamp to zero.
	pub fn with_clock_skew(mut self, skew: Duration) -> Self {
		self.clock_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Sets the cache key namespace.
	pub fn with_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.cache_key_prefix = Some(prefix.into());

		self
	}
}
impl Default for ManagerSettings {
	fn default() -> Self {
		Self { clock_skew: Self::DEFAULT_CLOCK_SKEW, cache_key_prefix: None }
	}
}

mod whole_seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub(super) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(duration.whole_seconds())
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u32::deserialize(deserializer).map(|secs| Duration::seconds(secs.into()))
	}
}
