//! Manager-level error types shared across flows, the transport, and the gateway boundary.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Machine-checkable failure category attached to every [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Required client settings are absent or unusable.
	ConfigurationMissing,
	/// Caller omitted a mandatory parameter.
	MissingRequiredField,
	/// No refresh token could be resolved from the argument, the store, or configuration.
	NoRefreshTokenAvailable,
	/// No currently valid access token could be produced.
	NoValidToken,
	/// Upstream answered with a non-success status.
	UpstreamRejected,
	/// Transport-level failure reaching the upstream endpoint.
	NetworkError,
	/// Upstream answered with a success status but an unusable body.
	InvalidResponse,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and JSON payloads.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::ConfigurationMissing => "configuration_missing",
			ErrorKind::MissingRequiredField => "missing_required_field",
			ErrorKind::NoRefreshTokenAvailable => "no_refresh_token_available",
			ErrorKind::NoValidToken => "no_valid_token",
			ErrorKind::UpstreamRejected => "upstream_rejected",
			ErrorKind::NetworkError => "network_error",
			ErrorKind::InvalidResponse => "invalid_response",
		}
	}

	/// Returns `true` for failures a caller may reasonably retry with backoff.
	pub const fn is_retryable(self) -> bool {
		matches!(self, ErrorKind::NetworkError)
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Success response that could not be turned into a token.
	#[error(transparent)]
	Response(#[from] ResponseError),

	/// Caller omitted a mandatory parameter.
	#[error("Required field `{field}` is missing.")]
	MissingRequiredField {
		/// Name of the missing parameter.
		field: &'static str,
	},
	/// Neither the caller, the store, nor the configuration supplied a refresh token.
	#[error("No refresh token is available.")]
	NoRefreshTokenAvailable,
	/// Token endpoint returned a non-success status.
	#[error("Token endpoint rejected the request: {description}.")]
	UpstreamRejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// OAuth `error` code, when the body carried one.
		error: Option<String>,
		/// Upstream `error_description` verbatim, or the best available summary.
		description: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl Error {
	/// Returns the machine-checkable category for this failure.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Config(_) => ErrorKind::ConfigurationMissing,
			Error::Transport(_) => ErrorKind::NetworkError,
			Error::Response(_) => ErrorKind::InvalidResponse,
			Error::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
			Error::NoRefreshTokenAvailable => ErrorKind::NoRefreshTokenAvailable,
			Error::UpstreamRejected { .. } => ErrorKind::UpstreamRejected,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client identifier is not configured.
	#[error("Client identifier is not configured.")]
	MissingClientId,
	/// Client secret is not configured.
	#[error("Client secret is not configured.")]
	MissingClientSecret,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Success responses that cannot be turned into a usable token.
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// Endpoint responded with JSON that does not match the token schema.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Endpoint response violated the protocol in some other way.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the violation.
		message: String,
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

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Endpoint label (`token endpoint`, `profile endpoint`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised against `endpoint`.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}
