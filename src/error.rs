//! Typed error taxonomy surfaced by every client call.

// self
use crate::{_prelude::*, http::Method};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error returned by the client.
///
/// The first nine variants are classified failures of a request (see
/// [`classify`](crate::classify)); [`Error::Config`] and [`Error::Body`] are local failures that
/// never reached the network.
#[derive(Debug, ThisError)]
pub enum Error {
	/// 401 from the API, or the token fetch itself failed.
	#[error("{detail}")]
	Auth {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// Underlying failure of the token fetch, if any.
		#[source]
		source: Option<BoxError>,
	},
	/// 403 from the API.
	#[error("{detail}")]
	Forbidden {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// Resource derived from the request path.
		resource: Option<String>,
	},
	/// 404 from the API.
	#[error("{detail}")]
	NotFound {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// Singular resource type (e.g. `entity`).
		resource_type: Option<String>,
		/// Identifier of the missing resource.
		identifier: Option<String>,
	},
	/// 400 or 422 from the API.
	#[error("{detail}")]
	Validation {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// Field-level errors reported by the API.
		field_errors: Vec<FieldError>,
	},
	/// 429 from the API.
	#[error("{detail}")]
	RateLimit {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// Retry-After hint from the response.
		retry_after: Option<Duration>,
	},
	/// 5xx from the API.
	#[error("{detail}")]
	Server {
		/// Diagnostic payload.
		detail: ErrorDetail,
	},
	/// Any other non-success status.
	#[error("{detail}")]
	Http {
		/// Diagnostic payload.
		detail: ErrorDetail,
	},
	/// Transport failure without an HTTP status, or caller cancellation.
	#[error("{detail}")]
	Network {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// `true` when the caller's cancellation token aborted the call.
		cancelled: bool,
		/// Underlying transport failure.
		#[source]
		source: Option<BoxError>,
	},
	/// A physical attempt exceeded its deadline.
	#[error("{detail}")]
	Timeout {
		/// Diagnostic payload.
		detail: ErrorDetail,
		/// Deadline applied to the attempt.
		timeout: Duration,
	},

	/// Local configuration or request-building problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Request or response body could not be (de)serialized.
	#[error(transparent)]
	Body(#[from] BodyError),
}
impl Error {
	/// Builds the network error returned when the caller cancels a call.
	pub fn cancelled(method: Method, url: impl Into<String>) -> Self {
		Self::Network {
			detail: ErrorDetail::new(ErrorKind::Network, "Request was cancelled by the caller.")
				.with_code("CANCELLED")
				.with_target(method, url),
			cancelled: true,
			source: None,
		}
	}

	/// Builds a cancellation error targeting the same request as `self`.
	pub(crate) fn cancelled_like(&self) -> Self {
		let mut detail =
			ErrorDetail::new(ErrorKind::Network, "Request was cancelled by the caller.")
				.with_code("CANCELLED");

		if let Some(origin) = self.detail() {
			detail.method = origin.method;
			detail.url = origin.url.clone();
		}

		Self::Network { detail, cancelled: true, source: None }
	}

	/// Builds the error returned when a physical attempt exceeds `timeout`.
	pub fn timed_out(method: Method, url: impl Into<String>, timeout: Duration) -> Self {
		Self::Timeout {
			detail: ErrorDetail::new(
				ErrorKind::Timeout,
				format!("Request timed out after {} ms.", timeout.as_millis()),
			)
			.with_target(method, url),
			timeout,
		}
	}

	/// Returns the taxonomy kind, or `None` for local failures.
	pub fn kind(&self) -> Option<ErrorKind> {
		self.detail().map(|detail| detail.kind)
	}

	/// Returns the diagnostic payload of classified failures.
	pub fn detail(&self) -> Option<&ErrorDetail> {
		match self {
			Self::Auth { detail, .. }
			| Self::Forbidden { detail, .. }
			| Self::NotFound { detail, .. }
			| Self::Validation { detail, .. }
			| Self::RateLimit { detail, .. }
			| Self::Server { detail }
			| Self::Http { detail }
			| Self::Network { detail, .. }
			| Self::Timeout { detail, .. } => Some(detail),
			Self::Config(_) | Self::Body(_) => None,
		}
	}

	/// HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		self.detail().and_then(|detail| detail.status)
	}

	/// Machine-readable code of classified failures.
	pub fn code(&self) -> Option<&str> {
		self.detail().map(|detail| detail.code.as_str())
	}

	/// Retry-After hint carried by rate limit failures.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::RateLimit { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// Returns `true` when the caller's cancellation token aborted the call.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Network { cancelled: true, .. })
	}

	/// Returns `true` when another attempt may succeed.
	///
	/// Transport failures, timeouts, 429, and 500/502/503/504 are retryable. Cancellation, any
	/// other status, and local failures are not.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Network { cancelled, .. } => !cancelled,
			Self::Timeout { .. } | Self::RateLimit { .. } => true,
			Self::Server { detail } => matches!(detail.status, Some(500 | 502 | 503 | 504)),
			_ => false,
		}
	}
}

/// Failure class of a classified error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Authentication failed.
	Auth,
	/// Access to the resource is forbidden.
	Forbidden,
	/// Resource does not exist.
	NotFound,
	/// Request was rejected as invalid.
	Validation,
	/// Rate limit exceeded.
	RateLimit,
	/// Upstream server failure.
	Server,
	/// Unmapped non-success status.
	Http,
	/// Transport failure.
	Network,
	/// Attempt deadline exceeded.
	Timeout,
}
impl ErrorKind {
	/// Default machine code used when the response body does not provide one.
	pub const fn default_code(self) -> &'static str {
		match self {
			ErrorKind::Auth => "AUTH_ERROR",
			ErrorKind::Forbidden => "FORBIDDEN",
			ErrorKind::NotFound => "NOT_FOUND",
			ErrorKind::Validation => "VALIDATION_ERROR",
			ErrorKind::RateLimit => "RATE_LIMIT",
			ErrorKind::Server => "SERVER_ERROR",
			ErrorKind::Http => "HTTP_ERROR",
			ErrorKind::Network => "NETWORK_ERROR",
			ErrorKind::Timeout => "TIMEOUT",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.default_code())
	}
}

/// Diagnostic payload shared by every classified error.
///
/// Only the method and URL of the failing request are kept; headers, request bodies, and
/// credentials never enter this struct.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorDetail {
	/// Failure class.
	pub kind: ErrorKind,
	/// Human-readable message.
	pub message: String,
	/// Machine-readable code.
	pub code: String,
	/// HTTP status, when a response was received.
	pub status: Option<u16>,
	/// Redacted response payload.
	pub details: Option<Value>,
	/// Method of the failing request.
	pub method: Option<Method>,
	/// URL of the failing request.
	pub url: Option<String>,
}
impl ErrorDetail {
	/// Creates a detail with the kind's default code.
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			code: kind.default_code().into(),
			status: None,
			details: None,
			method: None,
			url: None,
		}
	}

	/// Overrides the machine code.
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = code.into();

		self
	}

	/// Attaches the HTTP status.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Attaches a (redacted) details payload.
	pub fn with_details(mut self, details: Value) -> Self {
		self.details = Some(details);

		self
	}

	/// Attaches the failing request's method and URL.
	pub fn with_target(mut self, method: Method, url: impl Into<String>) -> Self {
		self.method = Some(method);
		self.url = Some(url.into());

		self
	}
}
impl Display for ErrorDetail {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.message)?;

		if let Some(status) = self.status {
			write!(f, " (status {status})")?;
		}
		if let (Some(method), Some(url)) = (self.method, self.url.as_deref()) {
			write!(f, " [{method} {url}]")?;
		}

		Ok(())
	}
}

/// Field-level validation failure reported by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	/// Field path, when reported.
	pub field: Option<String>,
	/// Failure message.
	pub message: String,
}

/// Configuration and request-building failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No credentials were supplied.
	#[error("Client credentials or an access token must be configured.")]
	MissingCredentials,
	/// A credential value was empty.
	#[error("The {field} credential must not be empty.")]
	EmptyCredential {
		/// Credential field name.
		field: &'static str,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses plain HTTP for a non-loopback host.
	#[error("The base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// URL that failed validation.
		url: String,
	},
	/// Proxy URL cannot be parsed or applied.
	#[error("Proxy configuration is invalid.")]
	InvalidProxy {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
	/// Timeout must be greater than zero.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The transport refused to send a request.
	#[error("Request {method} {url} could not be built.")]
	InvalidRequest {
		/// Method of the rejected request.
		method: Method,
		/// URL of the rejected request.
		url: String,
		/// Transport-specific builder failure.
		#[source]
		source: BoxError,
	},
	/// A header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a proxy parsing failure inside [`ConfigError`].
	pub fn invalid_proxy(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidProxy { source: Box::new(src) }
	}
}

/// Body serialization failures.
#[derive(Debug, ThisError)]
pub enum BodyError {
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	Encode(#[source] serde_json::Error),
	/// Successful response body did not match the expected shape.
	#[error("Response body of {method} {url} does not match the expected type.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// Method of the request.
		method: Method,
		/// URL of the request.
		url: String,
	},
}
