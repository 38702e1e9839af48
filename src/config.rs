//! Client configuration resolved once at construction.
//!
//! The module exposes [`ClientConfig`] plus its validating [`ClientConfigBuilder`]. Loading the
//! values (environment variables, files, secret managers) is left to the caller; every type
//! here implements [`Deserialize`] so any serde format can feed the builder.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::{Credentials, Secret}};

/// Public Port API regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
	#[default]
	/// European region.
	Eu,
	/// United States region.
	Us,
}
impl Region {
	/// Base URL of the region's public API.
	pub const fn base_url(self) -> &'static str {
		match self {
			Region::Eu => "https://api.getport.io",
			Region::Us => "https://api.us.getport.io",
		}
	}
}

/// Outbound proxy applied to every request, including the token fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
	/// Proxy URL.
	pub url: Url,
	/// Optional basic auth username.
	#[serde(default)]
	pub username: Option<String>,
	/// Optional basic auth password.
	#[serde(default)]
	pub password: Option<Secret>,
}
impl ProxyConfig {
	/// Creates an unauthenticated proxy configuration.
	pub fn new(url: Url) -> Self {
		Self { url, username: None, password: None }
	}

	/// Attaches basic auth credentials.
	pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self.password = Some(Secret::new(password));

		self
	}
}

/// Immutable configuration consumed by [`Client`](crate::client::Client).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Credentials used to authorize requests.
	pub credentials: Credentials,
	/// API base URL without a trailing slash (e.g. `https://api.getport.io`).
	pub base_url: String,
	/// Deadline applied to each physical attempt.
	pub timeout: Duration,
	/// Additional attempts after the initial one.
	pub max_retries: u32,
	/// Exponential backoff base.
	pub retry_delay: Duration,
	/// Optional outbound proxy.
	pub proxy: Option<ProxyConfig>,
	/// User agent sent with every request.
	pub user_agent: String,
}
impl ClientConfig {
	/// Default per-attempt timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

	/// Creates a new builder.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Absolute URL for `path` (which may or may not start with `/`).
	pub fn url_for(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	/// Token endpoint URL.
	pub fn token_url(&self) -> String {
		self.url_for(crate::auth::TOKEN_PATH)
	}
}

/// Default user agent.
pub fn default_user_agent() -> String {
	format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
