//! Client-level error types shared across the pipeline, stores, and transports.

// self
use crate::{_prelude::*, http::ResponseBody, store::StorageKind};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); no HTTP response exists.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Upstream answered with a non-success status.
	#[error("Request failed with HTTP status {status}.")]
	Status {
		/// HTTP status code returned by the server.
		status: u16,
		/// Raw response body returned alongside the status.
		body: ResponseBody,
	},
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded.")]
	Encode(#[source] serde_json::Error),
	/// The request queue consumer stopped before settling the request.
	#[error("Request queue is closed.")]
	QueueClosed,
}
impl Error {
	/// Returns the HTTP status carried by the failure, if the server answered.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be used to resolve request paths.
	#[error("Base URL `{url}` cannot be used to resolve request paths.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header name or value contains characters HTTP does not allow.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Retry base delay exceeds the configured cap.
	#[error("Retry base delay {base} exceeds the cap {cap}.")]
	InvalidRetryDelays {
		/// Configured base delay.
		base: Duration,
		/// Configured cap.
		cap: Duration,
	},
	/// Storage backend is a host-managed placeholder with no implementation.
	#[error("Token storage backend `{kind}` is not implemented.")]
	UnsupportedStorage {
		/// Rejected backend kind.
		kind: StorageKind,
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

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for a response.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Human-readable classification of a failed request, used for logging only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
	/// HTTP 400.
	BadRequest,
	/// HTTP 401.
	Unauthorized,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 500.
	ServerError,
	/// Any other status, or no response at all.
	Other,
}
impl ErrorClass {
	/// Classifies an optional HTTP status.
	pub const fn from_status(status: Option<u16>) -> Self {
		match status {
			Some(400) => Self::BadRequest,
			Some(401) => Self::Unauthorized,
			Some(403) => Self::Forbidden,
			Some(404) => Self::NotFound,
			Some(500) => Self::ServerError,
			_ => Self::Other,
		}
	}

	/// Returns the fixed message logged for this class.
	pub const fn message(self) -> &'static str {
		match self {
			Self::BadRequest => "Bad request; check the request parameters.",
			Self::Unauthorized => "Unauthorized; please sign in again.",
			Self::Forbidden => "Forbidden; access to this resource is denied.",
			Self::NotFound => "The requested resource was not found.",
			Self::ServerError => "Internal server error; please try again later.",
			Self::Other => "Network error; please check the connection and try again.",
		}
	}
}
impl Display for ErrorClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.message())
	}
}
