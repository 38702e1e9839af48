//! Optional observability helpers for client calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `port_sdk.request` with the `method` and
//!   `path` fields, plus events for scheduled retries and token fetches.
//! - Enable `metrics` to increment the `port_sdk_request_total` counter labeled by `method` +
//!   `outcome`: `attempt` for every physical attempt, `retry` for every attempt after the first,
//!   and `success` or `failure` once per call. The `port_sdk_token_fetch_total` counter is
//!   labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each logical call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// An attempt started.
	Attempt,
	/// A failed attempt was scheduled for another try.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Retry => "retry",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
