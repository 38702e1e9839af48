//! Bounded retry driver with exponential backoff.
//!
//! [`RetryPolicy::run`] re-invokes an attempt closure until it succeeds, fails with an error
//! that [`Error::is_retryable`] rejects, or the budget of `max_retries` additional attempts is
//! spent. Each attempt is responsible for its own deadline (see [`deadline`](crate::deadline)),
//! so the driver never shortens the window of a later attempt.

// self
use crate::{
	_prelude::*,
	deadline::{self, Interrupt},
	obs,
};

/// Retry budget and backoff base applied to one logical call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Additional attempts after the initial one.
	pub max_retries: u32,
	/// Backoff base; attempt `n` (0-indexed) waits `base_delay * 2^n` before the next try.
	pub base_delay: Duration,
}
impl RetryPolicy {
	/// Default number of retries.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default backoff base.
	pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
	/// Longest server-supplied Retry-After wait honored between attempts.
	pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

	/// Creates a policy with the given budget and backoff base.
	pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
		Self { max_retries, base_delay }
	}

	/// Policy allowing exactly one attempt.
	pub const fn disabled() -> Self {
		Self { max_retries: 0, base_delay: Duration::ZERO }
	}

	/// Total number of physical attempts the policy allows.
	pub const fn max_attempts(&self) -> u32 {
		self.max_retries.saturating_add(1)
	}

	/// Computed exponential backoff after failed attempt `attempt` (0-indexed).
	pub fn backoff_for(&self, attempt: u32) -> Duration {
		2_u32
			.checked_pow(attempt)
			.and_then(|factor| self.base_delay.checked_mul(factor))
			.unwrap_or(Duration::MAX)
	}

	/// Wait before the attempt following `attempt`, preferring a rate limit's Retry-After hint.
	///
	/// Hints longer than [`Self::MAX_RETRY_AFTER`] are clamped to it.
	pub fn delay_after(&self, attempt: u32, error: &Error) -> Duration {
		match error.retry_after() {
			Some(hint) => hint.min(Self::MAX_RETRY_AFTER),
			None => self.backoff_for(attempt),
		}
	}

	/// Returns `true` when failed attempt `attempt` (0-indexed) should be retried.
	pub fn should_retry(&self, attempt: u32, error: &Error) -> bool {
		attempt < self.max_retries && error.is_retryable()
	}

	/// Runs `attempt_fn` under the policy.
	///
	/// The closure receives the 0-indexed attempt number. When the budget is exhausted the error
	/// of the last attempt is returned unchanged. Cancelling `signal` during a backoff wait
	/// returns a cancelled [`Error::Network`] targeting the same request as the last failure.
	pub async fn run<T, F, Fut>(
		&self,
		signal: Option<&CancellationToken>,
		mut attempt_fn: F,
	) -> Result<T>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 0;

		loop {
			let error = match attempt_fn(attempt).await {
				Ok(value) => return Ok(value),
				Err(error) => error,
			};

			if !self.should_retry(attempt, &error) {
				return Err(error);
			}

			let delay = self.delay_after(attempt, &error);

			obs::retry_scheduled(attempt, delay, &error);

			if let Err(Interrupt::Cancelled) = deadline::pause(delay, signal).await {
				return Err(error.cancelled_like());
			}

			attempt += 1;
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BASE_DELAY)
	}
}
