//! Manager-level error types shared across stores, endpoints, and the introspection model.
//!
//! Every error is `Clone` so a single failed acquisition can be handed to every caller that
//! was coalesced into it; foreign sources are kept behind [`SharedError`].

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reference-counted error source that keeps [`Error`] cloneable.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Token cache backend failed to read or write.
	#[error("{0}")]
	CacheUnavailable(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token or introspection payload violated its expected shape.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
	/// Token endpoint returned an error or could not be reached.
	#[error(transparent)]
	TokenAcquisitionFailed(EndpointError),
	/// Introspection endpoint returned an error or could not be reached.
	#[error(transparent)]
	IntrospectionFailed(EndpointError),
	/// Authorized outbound request could not be sent.
	#[error("Authorized request could not be sent.")]
	SendFailed(#[source] SharedError),
}
impl Error {
	/// Returns the endpoint failure details for acquisition and introspection errors.
	pub fn endpoint_error(&self) -> Option<&EndpointError> {
		match self {
			Self::TokenAcquisitionFailed(e) | Self::IntrospectionFailed(e) => Some(e),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// No registration exists for the requested client name.
	#[error("No client registration named `{name}`.")]
	UnknownClient {
		/// Requested logical client name.
		name: String,
	},
	/// A registration with the same name already exists in the registry.
	#[error("Client `{name}` is registered more than once.")]
	DuplicateClient {
		/// Duplicated logical client name.
		name: String,
	},
	/// Client registration omitted the token endpoint.
	#[error("Client `{name}` is missing a token endpoint.")]
	MissingTokenEndpoint {
		/// Logical client name.
		name: String,
	},
	/// Introspection was requested for a client without an introspection endpoint.
	#[error("Client `{name}` has no introspection endpoint.")]
	MissingIntrospectionEndpoint {
		/// Logical client name.
		name: String,
	},
	/// Client registration omitted the OAuth client identifier.
	#[error("Client `{name}` is missing a client_id.")]
	MissingClientId {
		/// Logical client name.
		name: String,
	},
	/// Endpoint URL cannot be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS unless explicitly allowed.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying request builder failure.
		#[source]
		source: SharedError,
	},
	/// Registry or settings document could not be parsed.
	#[error("Configuration document is invalid at `{path}`.")]
	Parse {
		/// JSON path of the offending value.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}

	/// Wraps an HTTP request construction failure inside [`ConfigError`].
	pub fn http_request(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpRequest { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: Arc::new(e.into_inner()) }
	}
}

/// Payloads that do not match the shape the token or introspection endpoints promise.
#[derive(Clone, Debug, ThisError)]
pub enum MalformedResponseError {
	/// Body is not valid JSON.
	#[error("Response body is not valid JSON.")]
	InvalidJson {
		/// Underlying parsing failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
	/// Body is valid JSON but not an object.
	#[error("Response body must be a JSON object, found {found}.")]
	NotAnObject {
		/// JSON type that was found instead.
		found: &'static str,
	},
	/// The `active` member is present but is not a boolean.
	#[error("The active member must be a boolean, found {found}.")]
	InvalidActive {
		/// JSON type that was found instead.
		found: &'static str,
	},
	/// A time-valued claim is not a base-10 integer.
	#[error("Claim `{claim}` must be an integer number of seconds, found `{value}`.")]
	NonNumericTime {
		/// Claim type that failed to parse.
		claim: String,
		/// Raw claim value.
		value: String,
	},
	/// A time-valued claim is outside the representable range.
	#[error("Claim `{claim}` is outside the supported time range: {value}.")]
	TimeOutOfRange {
		/// Claim type that failed to convert.
		claim: String,
		/// Parsed seconds since the Unix epoch.
		value: i64,
	},
	/// Token endpoint responded with JSON that does not match the token response shape.
	#[error("Token endpoint returned malformed JSON at `{path}`.")]
	TokenResponse {
		/// JSON path of the offending value.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl MalformedResponseError {
	pub(crate) fn json_type(value: &serde_json::Value) -> &'static str {
		match value {
			serde_json::Value::Null => "null",
			serde_json::Value::Bool(_) => "boolean",
			serde_json::Value::Number(_) => "number",
			serde_json::Value::String(_) => "string",
			serde_json::Value::Array(_) => "array",
			serde_json::Value::Object(_) => "object",
		}
	}
}
impl From<serde_json::Error> for MalformedResponseError {
	fn from(e: serde_json::Error) -> Self {
		Self::InvalidJson { source: Arc::new(e) }
	}
}

/// Failure categories attached to [`EndpointError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	/// Client authentication failed or the client is not allowed to use the grant.
	InvalidClient,
	/// The grant itself was rejected.
	InvalidGrant,
	/// Requested scope or resource is not allowed for the client.
	InvalidScope,
	/// Endpoint reported a temporary failure.
	Transient,
	/// Endpoint could not be reached (DNS, TCP, TLS, I/O).
	Transport,
}
impl FailureKind {
	/// Returns a stable label suitable for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureKind::InvalidClient => "invalid_client",
			FailureKind::InvalidGrant => "invalid_grant",
			FailureKind::InvalidScope => "invalid_scope",
			FailureKind::Transient => "transient",
			FailureKind::Transport => "transport",
		}
	}

	/// Classifies an OAuth `error` code (RFC 6749 §5.2), falling back to the HTTP status.
	pub fn classify(oauth_error: Option<&str>, status: Option<u16>) -> Self {
		if let Some(kind) = oauth_error.and_then(Self::from_oauth_error) {
			return kind;
		}

		match status {
			Some(400 | 404 | 410) => FailureKind::InvalidGrant,
			Some(401) => FailureKind::InvalidClient,
			Some(403) => FailureKind::InvalidScope,
			_ => FailureKind::Transient,
		}
	}

	fn from_oauth_error(value: &str) -> Option<Self> {
		if value.eq_ignore_ascii_case("invalid_client")
			|| value.eq_ignore_ascii_case("unauthorized_client")
		{
			Some(FailureKind::InvalidClient)
		} else if value.eq_ignore_ascii_case("invalid_grant")
			|| value.eq_ignore_ascii_case("unsupported_grant_type")
			|| value.eq_ignore_ascii_case("access_denied")
		{
			Some(FailureKind::InvalidGrant)
		} else if value.eq_ignore_ascii_case("invalid_scope")
			|| value.eq_ignore_ascii_case("invalid_target")
			|| value.eq_ignore_ascii_case("insufficient_scope")
		{
			Some(FailureKind::InvalidScope)
		} else if value.eq_ignore_ascii_case("temporarily_unavailable")
			|| value.eq_ignore_ascii_case("server_error")
		{
			Some(FailureKind::Transient)
		} else {
			None
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Details of a failed call against a token or introspection endpoint.
///
/// Carries the endpoint-supplied OAuth `error`/`error_description` when present so callers
/// can tell a revoked client apart from an outage.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct EndpointError {
	/// Failure category.
	pub kind: FailureKind,
	/// OAuth `error` code returned by the endpoint.
	pub error: Option<String>,
	/// OAuth `error_description` returned by the endpoint.
	pub error_description: Option<String>,
	/// HTTP status code, when available.
	pub status: Option<u16>,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
	/// Human-readable summary.
	pub message: String,
	/// Underlying transport failure.
	#[source]
	pub source: Option<SharedError>,
}
impl EndpointError {
	/// Builds an error from an OAuth error response body.
	pub fn oauth(
		error: impl Into<String>,
		error_description: Option<String>,
		status: Option<u16>,
	) -> Self {
		let error = error.into();
		let kind = FailureKind::classify(Some(&error), status);
		let message = match &error_description {
			Some(description) =>
				format!("Endpoint returned an OAuth error: {error}: {description}."),
			None => format!("Endpoint returned an OAuth error: {error}."),
		};

		Self {
			kind,
			error: Some(error),
			error_description,
			status,
			retry_after: None,
			message,
			source: None,
		}
	}

	/// Builds an error for a failure that carries no OAuth error body.
	pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			error: None,
			error_description: None,
			status: None,
			retry_after: None,
			message: message.into(),
			source: None,
		}
	}

	/// Builds a transport-level failure around the underlying error.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::new(FailureKind::Transport, "Network error occurred while calling the endpoint.")
			.with_source(src)
	}

	/// Attaches an HTTP status code.
	pub fn with_status(mut self, status: Option<u16>) -> Self {
		self.status = status;

		self
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Attaches the underlying failure.
	pub fn with_source(mut self, src: impl 'static + Send + Sync + StdError) -> Self {
		self.source = Some(Arc::new(src));

		self
	}
}
