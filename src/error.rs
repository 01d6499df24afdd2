//! Crate-level error types shared by the token lifecycle and the gateway pipeline.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// No valid token could be obtained from the identity endpoint.
	#[error(transparent)]
	AuthFetch(#[from] AuthFetchError),
	/// A gateway answered with a non-success status.
	#[error(transparent)]
	Gateway(#[from] GatewayError),
	/// Transport failure while dispatching a gateway call.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}

/// Failure to obtain a token through the client-credentials exchange.
///
/// The type is `Clone` because a single failed exchange is reported to every caller that was
/// waiting on it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthFetchError {
	/// Identity endpoint answered with a non-success status.
	#[error("Identity endpoint rejected the client-credentials grant with status {status}.")]
	Rejected {
		/// HTTP status code returned by the identity endpoint.
		status: u16,
		/// Raw response body, kept for diagnostics.
		body: String,
	},
	/// Identity endpoint could not be reached.
	#[error("Identity endpoint is unreachable: {message}.")]
	Unreachable {
		/// Transport-supplied description of the failure.
		message: String,
	},
	/// The exchange did not complete in time.
	#[error("Identity endpoint timed out.")]
	TimedOut,
	/// Identity endpoint answered 2xx with a payload that is not a usable token.
	#[error("Identity endpoint returned a malformed token response: {message}.")]
	MalformedResponse {
		/// Parser- or validator-supplied description.
		message: String,
	},
	/// The shared exchange ended without publishing an outcome.
	#[error("Token refresh was interrupted before completing.")]
	Interrupted,
}
impl From<TransportError> for AuthFetchError {
	fn from(e: TransportError) -> Self {
		match e {
			TransportError::TimedOut => Self::TimedOut,
			TransportError::Network { source } => Self::Unreachable { message: source.to_string() },
		}
	}
}

/// Normalized non-success response from one of the gateways.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("Gateway responded with status {status}.")]
pub struct GatewayError {
	/// HTTP status code returned by the gateway.
	pub status: u16,
	/// Response body, parsed as JSON when possible and kept as a JSON string otherwise.
	pub body: Value,
}

/// Transport-level failures (network, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out.")]
	TimedOut,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::TimedOut } else { Self::network(e) }
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// A configured URL cannot be parsed.
	#[error("Configured URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The gateway base URL cannot carry a path.
	#[error("Base URL `{0}` cannot be used as a gateway base.")]
	CannotBeBase(String),
	/// A call path resolves outside its gateway's base path.
	#[error("Path `{0}` escapes the gateway base path.")]
	PathEscapesBase(String),
	/// A required setting is absent.
	#[error("Required setting `{0}` is missing.")]
	MissingSetting(&'static str),
	/// A numeric setting could not be parsed.
	#[error("Setting `{name}` must be an integer, got `{value}`.")]
	InvalidNumber {
		/// Setting name.
		name: &'static str,
		/// Offending value.
		value: String,
	},
	/// Credential cannot be carried in an HTTP header.
	#[error("Credential contains characters that are not valid in an HTTP header.")]
	InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
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
