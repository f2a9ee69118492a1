//! Optional observability helpers for manager operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_token_manager.op` with the `op` and
//!   `stage` (call site) fields, plus `warn!` events when the token cache misbehaves.
//! - Enable `metrics` to increment the `oauth2_token_manager_op_total` counter, labeled by
//!   `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Token lookup/acquisition through the cache.
	GetToken,
	/// Explicit cache eviction.
	ClearToken,
	/// RFC 7662 introspection call.
	Introspect,
	/// Outbound request decorated with a bearer token.
	SendAuthorized,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::GetToken => "get_token",
			Operation::ClearToken => "clear_token",
			Operation::Introspect => "introspect",
			Operation::SendAuthorized => "send_authorized",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Served from the cache without contacting the endpoint.
	CacheHit,
	/// Joined an acquisition already in flight for the same key.
	Coalesced,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::CacheHit => "cache_hit",
			Outcome::Coalesced => "coalesced",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
