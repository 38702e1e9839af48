// self
use crate::{
	_prelude::*,
	auth::Credentials,
	config::{ClientConfig, ProxyConfig, Region, default_user_agent},
	error::ConfigError,
	retry::RetryPolicy,
};

/// Builder for [`ClientConfig`] values.
///
/// Deserializes from the same camelCase keys the Port SDKs document (`baseUrl`, `timeout` and
/// `retryDelay` in milliseconds, `maxRetries`, `proxy`), so a resolved config file maps onto it
/// directly.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientConfigBuilder {
	/// Credentials used to authorize requests.
	#[serde(default)]
	pub credentials: Option<Credentials>,
	/// Explicit base URL; takes precedence over `region`.
	#[serde(default)]
	pub base_url: Option<String>,
	/// Region whose public API is used when no base URL is set.
	#[serde(default)]
	pub region: Region,
	/// Per-attempt timeout.
	#[serde(default, with = "millis")]
	pub timeout: Option<Duration>,
	/// Additional attempts after the initial one.
	#[serde(default)]
	pub max_retries: Option<u32>,
	/// Exponential backoff base.
	#[serde(default, with = "millis")]
	pub retry_delay: Option<Duration>,
	/// Optional outbound proxy.
	#[serde(default)]
	pub proxy: Option<ProxyConfig>,
	/// Optional user agent override.
	#[serde(default)]
	pub user_agent: Option<String>,
}
impl ClientConfigBuilder {
	/// Sets the credentials.
	pub fn credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Sets an explicit base URL.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());

		self
	}

	/// Selects the public API region.
	pub fn region(mut self, region: Region) -> Self {
		self.region = region;

		self
	}

	/// Overrides the per-attempt timeout (defaults to 30 seconds).
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Overrides the retry budget (defaults to 3).
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = Some(max_retries);

		self
	}

	/// Overrides the backoff base (defaults to 1 second).
	pub fn retry_delay(mut self, delay: Duration) -> Self {
		self.retry_delay = Some(delay);

		self
	}

	/// Routes every request through `proxy`.
	pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
		self.proxy = Some(proxy);

		self
	}

	/// Overrides the user agent.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let credentials = self.credentials.ok_or(ConfigError::MissingCredentials)?;

		credentials.validate()?;

		let raw_base = self.base_url.unwrap_or_else(|| self.region.base_url().to_owned());
		let base_url = validate_base_url(&raw_base)?;
		let timeout = self.timeout.unwrap_or(ClientConfig::DEFAULT_TIMEOUT);

		if timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}

		Ok(ClientConfig {
			credentials,
			base_url,
			timeout,
			max_retries: self.max_retries.unwrap_or(RetryPolicy::DEFAULT_MAX_RETRIES),
			retry_delay: self.retry_delay.unwrap_or(RetryPolicy::DEFAULT_BASE_DELAY),
			proxy: self.proxy,
			user_agent: self.user_agent.unwrap_or_else(default_user_agent),
		})
	}
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
	let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

	match url.scheme() {
		"https" => {},
		"http" if is_loopback(&url) => {},
		_ => return Err(ConfigError::InsecureBaseUrl { url: url.to_string() }),
	}

	Ok(url.as_str().trim_end_matches('/').to_owned())
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}

mod millis {
	// self
	use crate::_prelude::*;

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
	}
}
