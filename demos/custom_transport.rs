//! Plugs a custom [`HttpTransport`] into the client; the wrapper counts physical attempts
//! before delegating to the reqwest transport.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use port_sdk::{
	Client, ClientConfig, Credentials, RequestOptions,
	http::{HttpTransport, ReqwestTransport, TransportFuture, TransportRequest},
};

struct CountingTransport {
	inner: ReqwestTransport,
	attempts: AtomicUsize,
}
impl HttpTransport for CountingTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		self.attempts.fetch_add(1, Ordering::SeqCst);
		self.inner.send(request)
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let flaky = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/blueprints");
			then.status(503).json_body(json!({ "ok": false, "message": "Try again." }));
		})
		.await;
	let config = ClientConfig::builder()
		.credentials(Credentials::access_token("pre-issued-jwt"))
		.base_url(server.base_url())
		.max_retries(2)
		.retry_delay(std::time::Duration::from_millis(50))
		.build()?;
	let transport = Arc::new(CountingTransport {
		inner: ReqwestTransport::from_config(&config)?,
		attempts: AtomicUsize::new(0),
	});
	let client = Client::<CountingTransport>::with_transport(config, transport.clone());
	let outcome = client.get::<Value>("/v1/blueprints", RequestOptions::new()).await;

	println!(
		"Gave up after {} attempts: {}.",
		transport.attempts.load(Ordering::SeqCst),
		outcome.err().map(|err| err.to_string()).unwrap_or_default()
	);

	flaky.assert_calls_async(3).await;

	Ok(())
}
