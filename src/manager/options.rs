//! Per-call options for token acquisition.

// self
use crate::{
	_prelude::*,
	auth::{ResourceId, ScopeSet},
};

/// Per-call parameters of [`get_token`](crate::manager::ClientCredentialsTokenManager::get_token).
///
/// `resource` and `scope` override the registration defaults and partition the cache.
/// The authentication scheme names are carried for callers that route on them; the manager
/// does not interpret them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenRequestOptions {
	/// RFC 8707 resource indicator overriding the registration default.
	pub resource: Option<ResourceId>,
	/// Scope overriding the registration default.
	pub scope: Option<ScopeSet>,
	/// Skips the cache lookup and always acquires a new token.
	pub force_refresh: bool,
	/// Authentication scheme that issued the challenge for this call.
	pub challenge_scheme: Option<String>,
	/// Authentication scheme used to sign the caller in.
	pub sign_in_scheme: Option<String>,
}
impl TokenRequestOptions {
	/// Options that use every registration default.
	pub fn new() -> Self {
		Self::default()
	}

	/// Targets a specific resource.
	pub fn with_resource(mut self, resource: ResourceId) -> Self {
		self.resource = Some(resource);

		self
	}

	/// Requests a specific scope.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Bypasses cached records.
	pub fn force_refresh(mut self) -> Self {
		self.force_refresh = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force_refresh = force;

		self
	}

	/// Records the challenge scheme.
	pub fn with_challenge_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.challenge_scheme = Some(scheme.into());

		self
	}

	/// Records the sign-in scheme.
	pub fn with_sign_in_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.sign_in_scheme = Some(scheme.into());

		self
	}
}
