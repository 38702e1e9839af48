//! Cached bearer token and the token endpoint wire types.

// self
use crate::{_prelude::*, auth::Secret};

/// Lifecycle status of a cached token at an instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Token may be attached to requests.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// Bearer token issued by the token endpoint.
///
/// Tokens are immutable; a refresh produces a new value that replaces the old one wholesale.
#[derive(Clone)]
pub struct CachedToken {
	/// Bearer token secret; callers must avoid logging it.
	pub value: Secret,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Instant from which the token must no longer be used.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a token received at `issued_at` that lives for `expires_in` seconds.
	///
	/// Non-positive lifetimes yield a token that is already expired.
	pub fn issued(value: Secret, issued_at: OffsetDateTime, expires_in: i64) -> Self {
		let expires_at = if expires_in <= 0 {
			OffsetDateTime::UNIX_EPOCH
		} else {
			issued_at
				.checked_add(time::Duration::seconds(expires_in))
				.unwrap_or(time::macros::datetime!(9999-12-31 23:59:59 UTC))
		};

		Self { value, issued_at, expires_at }
	}

	/// Computes the lifecycle status at a given instant. Valid strictly before `expires_at`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.expires_at { TokenStatus::Active } else { TokenStatus::Expired }
	}

	/// Returns `true` if the token may be used at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the token may be used now.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Body posted to `/v1/auth/access_token`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessTokenRequest<'a> {
	pub(crate) client_id: &'a str,
	pub(crate) client_secret: &'a str,
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
	/// Issued bearer token.
	pub access_token: Secret,
	/// Lifetime in seconds.
	pub expires_in: i64,
	/// Token type label (usually `Bearer`).
	#[serde(default)]
	pub token_type: Option<String>,
}
