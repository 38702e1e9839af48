//! Bearer token acquisition and caching.
//!
//! [`TokenManager::get_token`] returns a pre-issued token unchanged, or reuses the cached
//! client-credentials token while it is valid and otherwise performs exactly one token fetch.
//! A fetch is never retried and never caches a partial result. Concurrent callers that observe
//! an expired token may each fetch; the last successful fetch wins the cache slot.

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRequest, AccessTokenResponse, CachedToken, Credentials, Secret},
	classify::{self, Target},
	config::ClientConfig,
	deadline::{self, Interrupt},
	error::{BoxError, ErrorDetail, ErrorKind},
	http::{HttpTransport, Method, TransportRequest},
	obs,
};

/// Token endpoint path relative to the API base URL.
pub const TOKEN_PATH: &str = "/v1/auth/access_token";

/// Supplies bearer tokens to the request executor.
pub struct TokenManager<T>
where
	T: ?Sized + HttpTransport,
{
	credentials: Credentials,
	token_url: String,
	timeout: Duration,
	user_agent: String,
	transport: Arc<T>,
	cached: RwLock<Option<CachedToken>>,
}
impl<T> TokenManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a manager that fetches tokens through `transport`.
	pub fn new(config: &ClientConfig, transport: Arc<T>) -> Self {
		Self {
			credentials: config.credentials.clone(),
			token_url: config.token_url(),
			timeout: config.timeout,
			user_agent: config.user_agent.clone(),
			transport,
			cached: RwLock::new(None),
		}
	}

	/// Returns a currently valid bearer token, fetching one when necessary.
	///
	/// Fails with [`Error::Auth`] when the fetch fails, or with a cancelled [`Error::Network`]
	/// when `signal` fires while the fetch is in flight.
	pub async fn get_token(&self, signal: Option<&CancellationToken>) -> Result<Secret> {
		let (client_id, client_secret) = match &self.credentials {
			Credentials::AccessToken { access_token } => return Ok(access_token.clone()),
			Credentials::ClientCredentials { client_id, client_secret } =>
				(client_id.as_str(), client_secret),
		};

		if let Some(token) = self.cached_at(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let result = self.fetch(client_id, client_secret, signal).await;

		obs::record_token_fetch(result.is_ok());

		let token = match result {
			Ok(token) => token,
			Err(err) => {
				obs::token_fetched(None, Some(&err));

				return Err(err);
			},
		};
		let value = token.value.clone();

		*self.cached.write() = Some(token);

		Ok(value)
	}

	/// Returns the cached token if it is still valid at `instant`.
	pub fn cached_at(&self, instant: OffsetDateTime) -> Option<Secret> {
		self.cached
			.read()
			.as_ref()
			.filter(|token| token.is_valid_at(instant))
			.map(|token| token.value.clone())
	}

	/// Returns a copy of the cached token record, valid or not.
	pub fn snapshot(&self) -> Option<CachedToken> {
		self.cached.read().clone()
	}

	/// Drops the cached token so the next call fetches a fresh one.
	pub fn invalidate(&self) {
		self.cached.write().take();
	}

	async fn fetch(
		&self,
		client_id: &str,
		client_secret: &Secret,
		signal: Option<&CancellationToken>,
	) -> Result<CachedToken> {
		let body = serde_json::to_vec(&AccessTokenRequest {
			client_id,
			client_secret: client_secret.expose(),
		})
		.map_err(crate::error::BodyError::Encode)?;
		let request = TransportRequest {
			method: Method::Post,
			url: self.token_url.clone(),
			headers: vec![
				("Content-Type".into(), "application/json".into()),
				("Accept".into(), "application/json".into()),
				("User-Agent".into(), self.user_agent.clone()),
			],
			body: Some(body),
		};
		let target = Target { method: Method::Post, path: TOKEN_PATH, url: &self.token_url };
		let response = match deadline::bounded(self.timeout, signal, self.transport.send(request))
			.await
		{
			Ok(Ok(response)) => response,
			Ok(Err(err)) => {
				let network = classify::classify_transport(target, err);

				return Err(self.auth_failure("Token request failed to reach Port.", None, network));
			},
			Err(Interrupt::Cancelled) => return Err(Error::cancelled(Method::Post, &self.token_url)),
			Err(Interrupt::TimedOut(timeout)) => {
				let timed_out = Error::timed_out(Method::Post, &self.token_url, timeout);

				return Err(self.auth_failure("Token request timed out.", None, timed_out));
			},
		};

		if !response.is_success() {
			let classified = classify::classify_response(target, &response);
			let mut detail = classified
				.detail()
				.cloned()
				.unwrap_or_else(|| ErrorDetail::new(ErrorKind::Auth, "Token request was rejected."));

			detail.kind = ErrorKind::Auth;
			detail.code = ErrorKind::Auth.default_code().into();
			detail.message = format!("Token request was rejected: {}", detail.message);

			return Err(Error::Auth { detail, source: None });
		}

		let de = &mut serde_json::Deserializer::from_slice(&response.body);
		let parsed: AccessTokenResponse = serde_path_to_error::deserialize(de).map_err(|err| {
			self.auth_failure("Token endpoint returned a malformed response.", Some(response.status), err)
		})?;

		if parsed.access_token.is_blank() {
			return Err(Error::Auth {
				detail: self.auth_detail("Token endpoint returned an empty access token.", Some(response.status)),
				source: None,
			});
		}

		obs::token_fetched(Some(parsed.expires_in), None);

		Ok(CachedToken::issued(parsed.access_token, OffsetDateTime::now_utc(), parsed.expires_in))
	}

	fn auth_detail(&self, message: &str, status: Option<u16>) -> ErrorDetail {
		let mut detail =
			ErrorDetail::new(ErrorKind::Auth, message).with_target(Method::Post, &self.token_url);

		detail.status = status;

		detail
	}

	fn auth_failure(
		&self,
		message: &str,
		status: Option<u16>,
		source: impl Into<BoxError>,
	) -> Error {
		Error::Auth { detail: self.auth_detail(message, status), source: Some(source.into()) }
	}
}
impl<T> Debug for TokenManager<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_url", &self.token_url)
			.field("cached", &self.cached.read())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{Scripted, ScriptedTransport};

	fn oauth_config() -> ClientConfig {
		ClientConfig::builder()
			.credentials(Credentials::client_credentials("client", "secret"))
			.base_url("http://127.0.0.1:9")
			.build()
			.expect("OAuth test configuration should be valid.")
	}

	#[tokio::test]
	async fn pre_issued_token_skips_network() {
		let transport = Arc::new(ScriptedTransport::default());
		let config = ClientConfig::builder()
			.credentials(Credentials::access_token("jwt"))
			.build()
			.expect("Token configuration should be valid.");
		let manager = TokenManager::new(&config, transport.clone());

		for _ in 0..3 {
			let token = manager.get_token(None).await.expect("Pre-issued token should be returned.");

			assert_eq!(token.expose(), "jwt");
		}

		assert_eq!(transport.calls(), 0);
		assert!(manager.snapshot().is_none());
	}

	#[tokio::test]
	async fn caches_until_expiry() {
		let transport = Arc::new(ScriptedTransport::new([Scripted::ok(
			r#"{"accessToken":"tok1","expiresIn":3600,"tokenType":"Bearer"}"#,
		)]));
		let manager = TokenManager::new(&oauth_config(), transport.clone());

		for _ in 0..5 {
			let token = manager.get_token(None).await.expect("Token fetch should succeed.");

			assert_eq!(token.expose(), "tok1");
		}

		assert_eq!(transport.calls(), 1);

		let request = &transport.requests()[0];
		let body: Value = serde_json::from_slice(request.body.as_deref().unwrap_or_default())
			.expect("Token request body should be JSON.");

		assert_eq!(request.url, "http://127.0.0.1:9/v1/auth/access_token");
		assert_eq!(request.method, Method::Post);
		assert_eq!(body, serde_json::json!({ "clientId": "client", "clientSecret": "secret" }));
		assert!(manager.cached_at(OffsetDateTime::now_utc() + time::Duration::hours(2)).is_none());
	}

	#[tokio::test]
	async fn zero_lifetime_forces_refetch() {
		let transport = Arc::new(ScriptedTransport::new([
			Scripted::ok(r#"{"accessToken":"first","expiresIn":0,"tokenType":"Bearer"}"#),
			Scripted::ok(r#"{"accessToken":"second","expiresIn":0,"tokenType":"Bearer"}"#),
		]));
		let manager = TokenManager::new(&oauth_config(), transport.clone());
		let first = manager.get_token(None).await.expect("First fetch should succeed.");
		let second = manager.get_token(None).await.expect("Second fetch should succeed.");

		assert_eq!(first.expose(), "first");
		assert_eq!(second.expose(), "second");
		assert_eq!(transport.calls(), 2);
	}

	#[tokio::test]
	async fn rejected_fetch_is_auth_error_and_not_cached() {
		let transport = Arc::new(ScriptedTransport::new([Scripted::status(
			401,
			r#"{"ok":false,"error":"invalid_credentials","message":"Bad client secret."}"#,
		)]));
		let manager = TokenManager::new(&oauth_config(), transport.clone());
		let err = manager.get_token(None).await.expect_err("Rejected fetch should fail.");

		assert!(matches!(err, Error::Auth { .. }));
		assert_eq!(err.status(), Some(401));
		assert!(manager.snapshot().is_none());
	}

	#[tokio::test]
	async fn malformed_body_is_auth_error() {
		let transport =
			Arc::new(ScriptedTransport::new([Scripted::ok(r#"{"accessToken":42}"#)]));
		let manager = TokenManager::new(&oauth_config(), transport);
		let err = manager.get_token(None).await.expect_err("Malformed token body should fail.");

		assert!(matches!(err, Error::Auth { source: Some(_), .. }));
		assert!(manager.snapshot().is_none());
	}

	#[tokio::test]
	async fn transport_failure_is_single_attempt_auth_error() {
		let transport = Arc::new(ScriptedTransport::new([Scripted::ConnectionReset]));
		let manager = TokenManager::new(&oauth_config(), transport.clone());
		let err = manager.get_token(None).await.expect_err("Unreachable endpoint should fail.");

		assert!(matches!(err, Error::Auth { .. }));
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test]
	async fn invalidate_drops_cached_token() {
		let transport = Arc::new(ScriptedTransport::new([Scripted::ok(
			r#"{"accessToken":"tok","expiresIn":3600,"tokenType":"Bearer"}"#,
		)]));
		let manager = TokenManager::new(&oauth_config(), transport.clone());

		manager.get_token(None).await.expect("Initial fetch should succeed.");
		manager.invalidate();
		manager.get_token(None).await.expect("Fetch after invalidation should succeed.");

		assert_eq!(transport.calls(), 2);
	}
}
