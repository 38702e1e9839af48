// self
use crate::{_prelude::*, http::Method};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by the request executor.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the request method + path.
	pub fn new(method: Method, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("port_sdk.request", method = method.as_str(), path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning that attempt `attempt` failed and another try follows after `delay`.
pub fn retry_scheduled(attempt: u32, delay: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			attempt,
			delay_ms = delay.as_millis() as u64,
			status = error.status(),
			code = error.code(),
			"Retrying Port API request."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, delay, error);
	}
}

/// Emits a debug event describing a token fetch; the token itself is never recorded.
pub fn token_fetched(expires_in: Option<i64>, error: Option<&Error>) {
	#[cfg(feature = "tracing")]
	{
		match error {
			None => tracing::debug!(expires_in, "Fetched Port access token."),
			Some(error) => tracing::debug!(%error, "Port access token fetch failed."),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (expires_in, error);
	}
}
