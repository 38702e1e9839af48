//! Backend SDK transport for the Port catalog API.
//!
//! [`Client`] attaches a cached client-credentials token to every call, retries transient
//! failures with exponential backoff, bounds each attempt with its own deadline, and maps
//! failures to the typed [`Error`] taxonomy.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod deadline;
pub mod error;
pub mod http;
pub mod obs;
pub mod retry;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use parking_lot::Mutex;
	// self
	use crate::{
		auth::Credentials,
		client::Client,
		config::ClientConfig,
		http::{HttpTransport, TransportError, TransportFuture, TransportRequest, TransportResponse},
	};

	/// Scripted outcome replayed by [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub enum Scripted {
		/// Respond with the given status and JSON body.
		Respond {
			/// HTTP status code.
			status: u16,
			/// Raw response body.
			body: String,
			/// Retry-After hint attached to the response.
			retry_after: Option<Duration>,
		},
		/// Fail with a connection-level error.
		ConnectionReset,
		/// Fail before sending, as a transport does for a request it cannot build.
		Rejected,
		/// Sleep on the tokio clock before responding with the boxed outcome.
		Stall(Duration, Box<Scripted>),
	}
	impl Scripted {
		/// 200 response with the given JSON body.
		pub fn ok(body: impl Into<String>) -> Self {
			Self::Respond { status: 200, body: body.into(), retry_after: None }
		}

		/// Response with an arbitrary status and JSON body.
		pub fn status(status: u16, body: impl Into<String>) -> Self {
			Self::Respond { status, body: body.into(), retry_after: None }
		}

		/// 429 response carrying a Retry-After hint.
		pub fn throttled(retry_after: Duration) -> Self {
			Self::Respond { status: 429, body: String::new(), retry_after: Some(retry_after) }
		}
	}

	/// In-process transport that replays scripted outcomes and records every request.
	///
	/// Once the script is exhausted the last outcome repeats, so a single entry models a
	/// permanently failing (or permanently healthy) upstream.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedTransport {
		script: Arc<Mutex<VecDeque<Scripted>>>,
		last: Arc<Mutex<Option<Scripted>>>,
		requests: Arc<Mutex<Vec<TransportRequest>>>,
	}
	impl ScriptedTransport {
		/// Builds a transport that replays `script` in order.
		pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
			Self {
				script: Arc::new(Mutex::new(script.into_iter().collect())),
				last: Default::default(),
				requests: Default::default(),
			}
		}

		/// Returns every request observed so far.
		pub fn requests(&self) -> Vec<TransportRequest> {
			self.requests.lock().clone()
		}

		/// Returns the number of physical attempts observed so far.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		fn next_outcome(&self) -> Scripted {
			let mut script = self.script.lock();
			let mut last = self.last.lock();

			match script.pop_front() {
				Some(outcome) => {
					*last = Some(outcome.clone());

					outcome
				},
				None => last.clone().unwrap_or(Scripted::ConnectionReset),
			}
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request);

			let outcome = self.next_outcome();

			Box::pin(async move {
				let mut outcome = outcome;

				loop {
					match outcome {
						Scripted::Respond { status, body, retry_after } =>
							return Ok(TransportResponse {
								status,
								retry_after,
								body: body.into_bytes(),
							}),
						Scripted::ConnectionReset =>
							return Err(TransportError::network(std::io::Error::new(
								std::io::ErrorKind::ConnectionReset,
								"connection reset by peer",
							))),
						Scripted::Rejected =>
							return Err(TransportError::invalid_request(std::io::Error::new(
								std::io::ErrorKind::InvalidInput,
								"request url is not absolute",
							))),
						Scripted::Stall(delay, then) => {
							tokio::time::sleep(delay).await;

							outcome = *then;
						},
					}
				}
			})
		}
	}

	/// Config pointing at a fake loopback host with a pre-issued token and a short retry delay.
	pub fn test_config() -> ClientConfig {
		ClientConfig::builder()
			.credentials(Credentials::access_token("test-token"))
			.base_url("http://127.0.0.1:9")
			.retry_delay(Duration::from_millis(10))
			.build()
			.expect("Test client configuration should be valid.")
	}

	/// Builds a [`Client`] over the given scripted transport.
	pub fn scripted_client(
		config: ClientConfig,
		transport: ScriptedTransport,
	) -> Client<ScriptedTransport> {
		Client::with_transport(config, transport)
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

pub use crate::{
	auth::Credentials,
	client::{Client, RequestOptions},
	config::{ClientConfig, ClientConfigBuilder, ProxyConfig, Region},
	error::{Error, ErrorKind, Result},
};
