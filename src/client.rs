//! Request executor façade used by Port resource wrappers.
//!
//! Every call merges its [`RequestOptions`] over the client defaults, then runs a bounded retry
//! loop where each attempt consults the [`TokenManager`], sends one deadline-bounded request,
//! and classifies the outcome. Successful bodies are decoded into the caller's type.

mod options;

pub use options::*;

// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	classify::{self, Target},
	config::ClientConfig,
	deadline,
	error::BodyError,
	http::{HttpTransport, Method, TransportRequest, TransportResponse},
	obs::{self, RequestOutcome, RequestSpan},
	retry::RetryPolicy,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Port API client.
///
/// Cheap to clone; clones share the transport and the token cache. The default type parameter
/// erases the transport so applications can name `Client` without generics.
pub struct Client<T = dyn HttpTransport>
where
	T: ?Sized + HttpTransport,
{
	config: Arc<ClientConfig>,
	transport: Arc<T>,
	tokens: Arc<TokenManager<T>>,
}
#[cfg(feature = "reqwest")]
impl Client {
	/// Builds a client over a reqwest transport honoring the configured proxy and user agent.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::from_config(&config)?);

		Ok(Self::with_transport(config, transport))
	}
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a client over a caller-supplied transport.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Self {
		let transport = transport.into();
		let tokens = Arc::new(TokenManager::new(&config, transport.clone()));

		Self { config: Arc::new(config), transport, tokens }
	}

	/// Configuration this client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token manager shared by every clone of this client.
	pub fn tokens(&self) -> &TokenManager<T> {
		&self.tokens
	}

	/// Sends a `GET` and decodes the response body.
	pub async fn get<R>(&self, path: &str, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.call(Method::Get, path, None, options).await
	}

	/// Sends a `POST` with a JSON body and decodes the response body.
	pub async fn post<B, R>(&self, path: &str, body: &B, options: RequestOptions) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.call(Method::Post, path, Some(encode(body)?), options).await
	}

	/// Sends a `PUT` with a JSON body and decodes the response body.
	pub async fn put<B, R>(&self, path: &str, body: &B, options: RequestOptions) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.call(Method::Put, path, Some(encode(body)?), options).await
	}

	/// Sends a `PATCH` with a JSON body and decodes the response body.
	pub async fn patch<B, R>(&self, path: &str, body: &B, options: RequestOptions) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.call(Method::Patch, path, Some(encode(body)?), options).await
	}

	/// Sends a `DELETE`; any response body is ignored.
	pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<()> {
		self.send(Method::Delete, path, None, options).await.map(|_| ())
	}

	/// Sends an arbitrary request with an optional JSON body.
	///
	/// Returns `None` for 204 and other empty bodies, otherwise the parsed JSON document.
	pub async fn execute(
		&self,
		method: Method,
		path: &str,
		body: Option<Value>,
		options: RequestOptions,
	) -> Result<Option<Value>> {
		let body = body.as_ref().map(encode).transpose()?;

		self.call(method, path, body, options).await
	}

	async fn call<R>(
		&self,
		method: Method,
		path: &str,
		body: Option<Vec<u8>>,
		options: RequestOptions,
	) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.send(method, path, body, options).await?;

		decode(method, &self.config.url_for(path), &response.body)
	}

	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<Vec<u8>>,
		options: RequestOptions,
	) -> Result<TransportResponse> {
		options.validate()?;

		let url = self.config.url_for(path);
		let signal = options.signal.as_ref();

		if signal.is_some_and(CancellationToken::is_cancelled) {
			return Err(Error::cancelled(method, url));
		}

		let policy = if options.skip_retry {
			RetryPolicy::disabled()
		} else {
			RetryPolicy::new(self.config.max_retries, self.config.retry_delay)
		};
		let headers = options::merge_headers(
			vec![
				("Content-Type".into(), "application/json".into()),
				("Accept".into(), "application/json".into()),
				("User-Agent".into(), self.config.user_agent.clone()),
			],
			&options.headers,
		);
		let call = Call {
			method,
			path,
			url: &url,
			body: body.as_deref(),
			headers: &headers,
			custom: &options.headers,
			timeout: options.timeout.unwrap_or(self.config.timeout),
			signal,
		};
		let span = RequestSpan::new(method, path);
		let result =
			span.instrument(policy.run(signal, move |attempt| self.attempt(call, attempt))).await;

		obs::record_request_outcome(
			method,
			if result.is_ok() { RequestOutcome::Success } else { RequestOutcome::Failure },
		);

		result
	}

	async fn attempt(&self, call: Call<'_>, attempt: u32) -> Result<TransportResponse> {
		obs::record_request_outcome(call.method, RequestOutcome::Attempt);

		if attempt > 0 {
			obs::record_request_outcome(call.method, RequestOutcome::Retry);
		}

		let token = self.tokens.get_token(call.signal).await?;
		let mut headers = Vec::with_capacity(call.headers.len() + 1);

		if !call.custom.iter().any(|(name, _)| name.eq_ignore_ascii_case("authorization")) {
			headers.push(("Authorization".to_owned(), format!("Bearer {}", token.expose())));
		}

		headers.extend_from_slice(call.headers);

		let request = TransportRequest {
			method: call.method,
			url: call.url.to_owned(),
			headers,
			body: call.body.map(<[u8]>::to_vec),
		};
		let target = Target { method: call.method, path: call.path, url: call.url };
		let response =
			match deadline::bounded(call.timeout, call.signal, self.transport.send(request)).await {
				Ok(Ok(response)) => response,
				Ok(Err(err)) => return Err(classify::classify_transport(target, err)),
				Err(interrupt) => return Err(classify::classify_interrupt(target, interrupt)),
			};

		if response.is_success() {
			return Ok(response);
		}

		let error = classify::classify_response(target, &response);

		if matches!(error, Error::Auth { .. }) {
			self.tokens.invalidate();
		}

		Err(error)
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			tokens: self.tokens.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("config", &self.config)
			.field("tokens", &self.tokens)
			.finish_non_exhaustive()
	}
}

#[derive(Clone, Copy)]
struct Call<'a> {
	method: Method,
	path: &'a str,
	url: &'a str,
	body: Option<&'a [u8]>,
	headers: &'a [(String, String)],
	custom: &'a [(String, String)],
	timeout: Duration,
	signal: Option<&'a CancellationToken>,
}

fn encode<B>(body: &B) -> Result<Vec<u8>>
where
	B: ?Sized + Serialize,
{
	Ok(serde_json::to_vec(body).map_err(BodyError::Encode)?)
}

fn decode<R>(method: Method, url: &str, body: &[u8]) -> Result<R>
where
	R: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
	let de = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(de)
		.map_err(|source| BodyError::Decode { source, method, url: url.to_owned() }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, error::ConfigError};

	#[derive(Debug, Deserialize, PartialEq)]
	struct Entity {
		identifier: String,
	}

	#[tokio::test]
	async fn sends_defaults_and_bearer_token() {
		let transport = ScriptedTransport::new([Scripted::ok(r#"{"identifier":"api"}"#)]);
		let client = scripted_client(test_config(), transport.clone());
		let entity: Entity = client
			.get("/v1/blueprints/service/entities/api", RequestOptions::new().header("X-Trace", "7"))
			.await
			.expect("Entity fetch should succeed.");
		let request = &transport.requests()[0];

		assert_eq!(entity, Entity { identifier: "api".into() });
		assert_eq!(request.url, "http://127.0.0.1:9/v1/blueprints/service/entities/api");
		assert_eq!(request.header("authorization"), Some("Bearer test-token"));
		assert_eq!(request.header("accept"), Some("application/json"));
		assert_eq!(request.header("content-type"), Some("application/json"));
		assert_eq!(request.header("x-trace"), Some("7"));
		assert!(request.header("user-agent").is_some_and(|ua| ua.starts_with("port-sdk/")));
	}

	#[tokio::test]
	async fn empty_body_decodes_as_null() {
		let transport = ScriptedTransport::new([Scripted::status(204, "")]);
		let client = scripted_client(test_config(), transport);
		let value = client
			.execute(Method::Delete, "/v1/teams/platform", None, RequestOptions::new())
			.await
			.expect("No-content response should succeed.");

		client
			.post::<_, ()>("/v1/teams", &serde_json::json!({ "name": "x" }), RequestOptions::new())
			.await
			.expect("Unit decode of an empty body should succeed.");

		assert_eq!(value, None);
	}

	#[tokio::test]
	async fn mismatched_body_reports_json_path() {
		let transport = ScriptedTransport::new([Scripted::ok(r#"{"identifier":7}"#)]);
		let client = scripted_client(test_config(), transport);
		let err = client
			.get::<Entity>("/v1/entities/x", RequestOptions::new())
			.await
			.expect_err("Type mismatch should fail.");

		match err {
			Error::Body(BodyError::Decode { source, method, .. }) => {
				assert_eq!(source.path().to_string(), "identifier");
				assert_eq!(method, Method::Get);
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn invalid_header_fails_before_network() {
		let transport = ScriptedTransport::new([Scripted::ok("{}")]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new().header("Bad Header", "x"))
			.await
			.expect_err("Invalid header should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidHeader { .. })));
		assert_eq!(transport.calls(), 0);
	}

	#[tokio::test]
	async fn pre_cancelled_signal_makes_no_attempt() {
		let transport = ScriptedTransport::new([Scripted::ok("{}")]);
		let client = scripted_client(test_config(), transport.clone());
		let signal = CancellationToken::new();

		signal.cancel();

		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new().signal(signal))
			.await
			.expect_err("Cancelled call should fail.");

		assert!(err.is_cancelled());
		assert_eq!(transport.calls(), 0);
	}

	#[tokio::test]
	async fn unauthorized_response_drops_cached_token() {
		let transport = ScriptedTransport::new([
			Scripted::ok(r#"{"accessToken":"tok","expiresIn":3600,"tokenType":"Bearer"}"#),
			Scripted::status(401, r#"{"message":"Token revoked."}"#),
		]);
		let config = ClientConfig::builder()
			.credentials(crate::auth::Credentials::client_credentials("id", "secret"))
			.base_url("http://127.0.0.1:9")
			.build()
			.expect("Test configuration should be valid.");
		let client = scripted_client(config, transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new())
			.await
			.expect_err("401 should fail.");

		assert!(matches!(err, Error::Auth { .. }));
		assert_eq!(err.status(), Some(401));
		assert_eq!(transport.calls(), 2);
		assert!(client.tokens().snapshot().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn persistent_server_errors_exhaust_budget() {
		let transport =
			ScriptedTransport::new([Scripted::status(503, r#"{"message":"Unavailable."}"#)]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new())
			.await
			.expect_err("Persistent 503 should fail.");

		assert_eq!(transport.calls(), 4);
		assert!(matches!(err, Error::Server { .. }));
		assert_eq!(err.status(), Some(503));
	}

	#[tokio::test(start_paused = true)]
	async fn skip_retry_makes_single_attempt() {
		let transport = ScriptedTransport::new([Scripted::status(500, "")]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new().skip_retry())
			.await
			.expect_err("500 should fail.");

		assert_eq!(transport.calls(), 1);
		assert_eq!(err.status(), Some(500));
	}

	#[tokio::test(start_paused = true)]
	async fn persistent_connection_failures_exhaust_budget() {
		let transport = ScriptedTransport::new([Scripted::ConnectionReset]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new())
			.await
			.expect_err("Unreachable upstream should fail.");

		assert_eq!(transport.calls(), 4);
		assert!(matches!(err, Error::Network { cancelled: false, .. }));
		assert_eq!(err.code(), Some("NETWORK_ERROR"));
	}

	#[tokio::test(start_paused = true)]
	async fn skip_retry_propagates_connection_failure() {
		let transport = ScriptedTransport::new([Scripted::ConnectionReset]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new().skip_retry())
			.await
			.expect_err("Connection failure should fail.");

		assert_eq!(transport.calls(), 1);
		assert!(matches!(err, Error::Network { cancelled: false, .. }));
	}

	#[tokio::test(start_paused = true)]
	async fn unsendable_request_is_not_retried() {
		let transport = ScriptedTransport::new([Scripted::Rejected]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new())
			.await
			.expect_err("Rejected request should fail.");

		assert_eq!(transport.calls(), 1);
		assert!(!err.is_retryable());
		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidRequest { method: Method::Get, ref url, .. })
				if url == "http://127.0.0.1:9/v1/entities"
		));
	}

	#[tokio::test(start_paused = true)]
	async fn bad_request_is_not_retried() {
		let transport = ScriptedTransport::new([Scripted::status(
			400,
			r#"{"message":"Invalid entity.","errors":[{"field":"title","message":"Required."}]}"#,
		)]);
		let client = scripted_client(test_config(), transport.clone());
		let err = client
			.post::<_, Value>("/v1/entities", &serde_json::json!({}), RequestOptions::new())
			.await
			.expect_err("400 should fail.");

		assert_eq!(transport.calls(), 1);

		match err {
			Error::Validation { field_errors, .. } =>
				assert_eq!(field_errors[0].field.as_deref(), Some("title")),
			other => panic!("Expected a validation error, got {other:?}."),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn retry_after_hint_sets_the_wait() {
		let transport = ScriptedTransport::new([
			Scripted::throttled(Duration::from_secs(2)),
			Scripted::ok(r#"{"ok":true}"#),
		]);
		let client = scripted_client(test_config(), transport.clone());
		let started = tokio::time::Instant::now();
		let value = client
			.execute(Method::Get, "/v1/entities", None, RequestOptions::new())
			.await
			.expect("Second attempt should succeed.");

		assert_eq!(value, Some(serde_json::json!({ "ok": true })));
		assert_eq!(transport.calls(), 2);
		assert!(started.elapsed() >= Duration::from_secs(2));
	}

	#[tokio::test(start_paused = true)]
	async fn each_attempt_gets_a_fresh_deadline() {
		let transport = ScriptedTransport::new([
			Scripted::Stall(Duration::from_millis(500), Box::new(Scripted::ok("{}"))),
			Scripted::Stall(Duration::from_millis(80), Box::new(Scripted::ok(r#"{"n":2}"#))),
		]);
		let client = scripted_client(test_config(), transport.clone());
		let value = client
			.get::<Value>("/v1/entities", RequestOptions::new().timeout(Duration::from_millis(100)))
			.await
			.expect("Second attempt should finish within its own window.");

		assert_eq!(value, serde_json::json!({ "n": 2 }));
		assert_eq!(transport.calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn slow_attempt_fails_with_applied_timeout() {
		let transport = ScriptedTransport::new([Scripted::Stall(
			Duration::from_secs(5),
			Box::new(Scripted::ok("{}")),
		)]);
		let client = scripted_client(test_config(), transport);
		let err = client
			.get::<Value>(
				"/v1/entities",
				RequestOptions::new().timeout(Duration::from_millis(100)).skip_retry(),
			)
			.await
			.expect_err("Stalled attempt should time out.");

		assert!(matches!(err, Error::Timeout { timeout, .. } if timeout == Duration::from_millis(100)));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_aborts_in_flight_attempt() {
		let transport = ScriptedTransport::new([Scripted::Stall(
			Duration::from_secs(60),
			Box::new(Scripted::ok("{}")),
		)]);
		let client = scripted_client(test_config(), transport.clone());
		let signal = CancellationToken::new();
		let trigger = signal.clone();
		let started = tokio::time::Instant::now();

		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			trigger.cancel();
		});

		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new().signal(signal.clone()))
			.await
			.expect_err("Cancelled call should fail.");

		assert!(err.is_cancelled());
		assert!(signal.is_cancelled());
		assert_eq!(transport.calls(), 1);
		assert!(started.elapsed() < Duration::from_secs(30));
	}

	#[tokio::test(start_paused = true)]
	async fn expired_token_is_refetched_between_attempts() {
		let transport = ScriptedTransport::new([
			Scripted::ok(r#"{"accessToken":"a","expiresIn":0,"tokenType":"Bearer"}"#),
			Scripted::status(502, ""),
			Scripted::ok(r#"{"accessToken":"b","expiresIn":0,"tokenType":"Bearer"}"#),
			Scripted::ok("{}"),
		]);
		let config = ClientConfig::builder()
			.credentials(crate::auth::Credentials::client_credentials("id", "secret"))
			.base_url("http://127.0.0.1:9")
			.retry_delay(Duration::from_millis(10))
			.build()
			.expect("Test configuration should be valid.");
		let client = scripted_client(config, transport.clone());

		client
			.get::<Value>("/v1/entities", RequestOptions::new())
			.await
			.expect("Retry with a fresh token should succeed.");

		let requests = transport.requests();

		assert_eq!(requests.len(), 4);
		assert_eq!(requests[1].header("authorization"), Some("Bearer a"));
		assert_eq!(requests[3].header("authorization"), Some("Bearer b"));
	}

	#[tokio::test(start_paused = true)]
	async fn failed_token_fetch_is_terminal() {
		let transport = ScriptedTransport::new([Scripted::status(500, "")]);
		let config = ClientConfig::builder()
			.credentials(crate::auth::Credentials::client_credentials("id", "secret"))
			.base_url("http://127.0.0.1:9")
			.build()
			.expect("Test configuration should be valid.");
		let client = scripted_client(config, transport.clone());
		let err = client
			.get::<Value>("/v1/entities", RequestOptions::new())
			.await
			.expect_err("Token failure should fail the call.");

		assert!(matches!(err, Error::Auth { .. }));
		assert_eq!(transport.calls(), 1);
	}
}
