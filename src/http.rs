//! Transport primitives for Port API calls.
//!
//! The module exposes [`HttpTransport`] alongside [`TransportRequest`] and
//! [`TransportResponse`] so downstream crates can plug custom HTTP stacks into the client
//! without losing its retry, deadline, and classification layers. A transport performs exactly
//! one physical call per [`HttpTransport::send`]; it must not retry, follow redirects, or apply
//! its own timeout, because those policies belong to the client.

// self
use crate::{_prelude::*, error::BoxError};
#[cfg(feature = "reqwest")]
use crate::{config::ClientConfig, error::ConfigError};
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// HTTP methods used by the Port API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the upper-case wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved request handed to a transport.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportRequest {
	/// Request method.
	pub method: Method,
	/// Absolute request URL.
	pub url: String,
	/// Header pairs in send order; later entries override earlier ones with the same name.
	pub headers: Vec<(String, String)>,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
}
impl TransportRequest {
	/// Returns the last value set for `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.rev()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for TransportRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(key, value)| {
				if key.eq_ignore_ascii_case("authorization") {
					(key.as_str(), "<redacted>")
				} else {
					(key.as_str(), value.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("TransportRequest")
			.field("method", &self.method)
			.field("url", &self.url)
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Raw response produced by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the Port API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport rejected the request before sending it.
	#[error("Request could not be built.")]
	InvalidRequest {
		/// Transport-specific builder error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific request building error.
	pub fn invalid_request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidRequest { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() { Self::invalid_request(e) } else { Self::network(e) }
	}
}

/// Abstraction over HTTP stacks capable of executing one physical Port API call.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// clones of a [`Client`](crate::client::Client), and the returned future must be `Send` and
/// safe to drop at any point: the client drops it to enforce deadlines and cancellation.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Performs exactly one request.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are not followed and no client-level timeout is set; the Port client applies its
/// own per-attempt deadline.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport honoring the proxy and user agent in `config`.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.user_agent(config.user_agent.clone());

		if let Some(proxy) = config.proxy.as_ref() {
			let mut upstream =
				reqwest::Proxy::all(proxy.url.as_str()).map_err(ConfigError::invalid_proxy)?;

			if let Some(username) = proxy.username.as_deref() {
				let password = proxy.password.as_ref().map(|secret| secret.expose()).unwrap_or("");

				upstream = upstream.basic_auth(username, password);
			}

			builder = builder.proxy(upstream);
		}

		builder.build().map(Self).map_err(ConfigError::http_client_build)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.0.request(method, request.url.as_str());

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;

	parse_retry_after_value(value.to_str().ok()?)
}

/// Parses a `Retry-After` value given either as delay seconds or as an HTTP date.
pub fn parse_retry_after_value(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc2822)
	{
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Duration::try_from(delta).ok();
		}
	}

	None
}
