// self
use crate::{http::Method, obs::RequestOutcome};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(method: Method, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"port_sdk_request_total",
			"method" => method.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (method, outcome);
	}
}

/// Records a token fetch outcome (`success` or `failure`) via the global metrics recorder.
pub fn record_token_fetch(success: bool) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"port_sdk_token_fetch_total",
			"outcome" => if success { "success" } else { "failure" }
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = success;
	}
}
