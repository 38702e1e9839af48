// self
use crate::{_prelude::*, error::ConfigError};

/// Per-call overrides merged over the client defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Deadline applied to each physical attempt instead of the client timeout.
	pub timeout: Option<Duration>,
	/// Extra headers; a header named like a default one replaces it.
	pub headers: Vec<(String, String)>,
	/// Disables retries so the call makes exactly one attempt.
	pub skip_retry: bool,
	/// Caller-owned cancellation token observed by attempts and backoff waits.
	pub signal: Option<CancellationToken>,
}
impl RequestOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the per-attempt deadline.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Adds a custom header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Limits the call to one attempt.
	pub fn skip_retry(mut self) -> Self {
		self.skip_retry = true;

		self
	}

	/// Attaches a cancellation token.
	pub fn signal(mut self, signal: CancellationToken) -> Self {
		self.signal = Some(signal);

		self
	}

	pub(crate) fn validate(&self) -> Result<(), ConfigError> {
		if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ConfigError::ZeroTimeout);
		}
		if let Some((name, _)) =
			self.headers.iter().find(|(name, value)| !valid_header_name(name) || !valid_header_value(value))
		{
			return Err(ConfigError::InvalidHeader { name: name.clone() });
		}

		Ok(())
	}
}

/// Merges `custom` over `defaults`; later entries replace earlier ones with the same name.
pub(crate) fn merge_headers(
	defaults: Vec<(String, String)>,
	custom: &[(String, String)],
) -> Vec<(String, String)> {
	let mut merged = defaults;

	for (name, value) in custom {
		merged.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
		merged.push((name.clone(), value.clone()));
	}

	merged
}

fn valid_header_name(name: &str) -> bool {
	!name.is_empty()
		&& name.bytes().all(|byte| byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte))
}

fn valid_header_value(value: &str) -> bool {
	value.bytes().all(|byte| byte == b'\t' || (0x20..0x7f).contains(&byte))
}
