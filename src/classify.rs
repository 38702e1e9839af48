//! Maps raw attempt outcomes to typed [`Error`] values.
//!
//! Every failure of an attempt passes through this module exactly once: HTTP responses with a
//! non-success status go through [`classify_response`], transport failures through
//! [`classify_transport`], and deadline/cancellation interrupts through [`classify_interrupt`].
//! Error bodies are parsed leniently; a body that is not JSON only loses the message and
//! details, never the classification. Sensitive keys are redacted before a body is attached to
//! an error.

// self
use crate::{
	_prelude::*,
	deadline::Interrupt,
	error::{ConfigError, ErrorDetail, ErrorKind, FieldError},
	http::{Method, TransportError, TransportResponse},
};

const REDACTED: &str = "<redacted>";
const SENSITIVE_KEYS: &[&str] = &[
	"accesstoken",
	"access_token",
	"authorization",
	"clientsecret",
	"client_secret",
	"cookie",
	"password",
	"refreshtoken",
	"refresh_token",
	"secret",
	"token",
];

/// Request coordinates attached to classified errors.
#[derive(Clone, Copy, Debug)]
pub struct Target<'a> {
	/// Request method.
	pub method: Method,
	/// Request path relative to the base URL.
	pub path: &'a str,
	/// Absolute request URL.
	pub url: &'a str,
}

/// Classifies a response whose status is not 2xx.
pub fn classify_response(target: Target<'_>, response: &TransportResponse) -> Error {
	let status = response.status;
	let body = serde_json::from_slice::<Value>(&response.body).ok();
	let kind = kind_for_status(status);
	let detail = build_detail(kind, status, body.as_ref(), target);

	match kind {
		ErrorKind::Auth => Error::Auth { detail, source: None },
		ErrorKind::Forbidden =>
			Error::Forbidden { detail, resource: resource_segments(target.path).map(|(ty, _)| ty) },
		ErrorKind::NotFound => {
			let from_path = resource_segments(target.path);
			let identifier = body
				.as_ref()
				.and_then(body_identifier)
				.or_else(|| from_path.as_ref().and_then(|(_, id)| id.clone()));

			Error::NotFound {
				detail,
				resource_type: from_path.map(|(resource_type, _)| resource_type),
				identifier,
			}
		},
		ErrorKind::Validation => Error::Validation {
			detail,
			field_errors: body.as_ref().map(field_errors).unwrap_or_default(),
		},
		ErrorKind::RateLimit => Error::RateLimit { detail, retry_after: response.retry_after },
		ErrorKind::Server => Error::Server { detail },
		ErrorKind::Http | ErrorKind::Network | ErrorKind::Timeout => Error::Http { detail },
	}
}

/// Classifies a transport failure.
///
/// Network failures become a retryable [`Error::Network`]. A request the transport refused to
/// send never reached Port, so it becomes a terminal [`Error::Config`].
pub fn classify_transport(target: Target<'_>, error: TransportError) -> Error {
	match error {
		TransportError::Network { source } => Error::Network {
			detail: ErrorDetail::new(ErrorKind::Network, format!("Network error: {source}."))
				.with_target(target.method, target.url),
			cancelled: false,
			source: Some(source),
		},
		TransportError::InvalidRequest { source } => Error::Config(ConfigError::InvalidRequest {
			method: target.method,
			url: target.url.to_owned(),
			source,
		}),
	}
}

/// Classifies a deadline expiry or caller cancellation.
pub fn classify_interrupt(target: Target<'_>, interrupt: Interrupt) -> Error {
	match interrupt {
		Interrupt::TimedOut(timeout) => Error::timed_out(target.method, target.url, timeout),
		Interrupt::Cancelled => Error::cancelled(target.method, target.url),
	}
}

/// Maps a status code to its failure class.
pub fn kind_for_status(status: u16) -> ErrorKind {
	match status {
		401 => ErrorKind::Auth,
		403 => ErrorKind::Forbidden,
		404 => ErrorKind::NotFound,
		400 | 422 => ErrorKind::Validation,
		429 => ErrorKind::RateLimit,
		500..=599 => ErrorKind::Server,
		_ => ErrorKind::Http,
	}
}

/// Replaces values of sensitive keys with `"<redacted>"`, recursively.
pub fn redact(mut value: Value) -> Value {
	redact_in_place(&mut value);

	value
}

fn redact_in_place(value: &mut Value) {
	match value {
		Value::Object(map) =>
			for (key, inner) in map.iter_mut() {
				if is_sensitive(key) {
					*inner = Value::String(REDACTED.into());
				} else {
					redact_in_place(inner);
				}
			},
		Value::Array(items) => items.iter_mut().for_each(redact_in_place),
		_ => {},
	}
}

fn is_sensitive(key: &str) -> bool {
	let lowered = key.to_ascii_lowercase();

	SENSITIVE_KEYS.contains(&lowered.as_str())
}

fn build_detail(kind: ErrorKind, status: u16, body: Option<&Value>, target: Target<'_>) -> ErrorDetail {
	let message = body
		.and_then(|value| value.get("message"))
		.and_then(Value::as_str)
		.map(str::to_owned)
		.unwrap_or_else(|| default_message(kind, status));
	let mut detail = ErrorDetail::new(kind, message)
		.with_status(status)
		.with_target(target.method, target.url);

	if let Some(code) = body.and_then(|value| value.get("error")).and_then(Value::as_str) {
		detail = detail.with_code(code);
	}
	if let Some(body) = body {
		detail = detail.with_details(redact(body.clone()));
	}

	detail
}

fn default_message(kind: ErrorKind, status: u16) -> String {
	match kind {
		ErrorKind::Auth => "Authentication with the Port API failed.".into(),
		ErrorKind::Forbidden => "Access to the requested resource is forbidden.".into(),
		ErrorKind::NotFound => "The requested resource was not found.".into(),
		ErrorKind::Validation => "The request was rejected as invalid.".into(),
		ErrorKind::RateLimit => "Rate limit exceeded.".into(),
		ErrorKind::Server => format!("Port API server error ({status})."),
		_ => format!("Port API returned an unexpected status ({status})."),
	}
}

fn body_identifier(body: &Value) -> Option<String> {
	body.get("details")
		.and_then(|details| details.get("identifier"))
		.or_else(|| body.get("identifier"))
		.and_then(Value::as_str)
		.map(str::to_owned)
}

fn field_errors(body: &Value) -> Vec<FieldError> {
	let Some(items) = body
		.get("errors")
		.and_then(Value::as_array)
		.or_else(|| body.get("details").and_then(Value::as_array))
	else {
		return Vec::new();
	};

	items
		.iter()
		.filter_map(|item| match item {
			Value::String(message) => Some(FieldError { field: None, message: message.clone() }),
			Value::Object(map) => {
				let message = map.get("message").and_then(Value::as_str)?.to_owned();
				let field = map
					.get("field")
					.or_else(|| map.get("path"))
					.and_then(|field| match field {
						Value::String(path) => Some(path.clone()),
						Value::Array(parts) => Some(
							parts
								.iter()
								.map(|part| match part {
									Value::String(s) => s.clone(),
									other => other.to_string(),
								})
								.collect::<Vec<_>>()
								.join("."),
						),
						_ => None,
					});

				Some(FieldError { field, message })
			},
			_ => None,
		})
		.collect()
}

/// Splits a path into `(singular resource type, identifier)`.
///
/// The last collection segment names the resource type and the segment after it, when present,
/// the identifier; `/v1/blueprints/service/entities/api` yields `("entity", Some("api"))`.
fn resource_segments(path: &str) -> Option<(String, Option<String>)> {
	let path = path.split(['?', '#']).next().unwrap_or_default();
	let segments = path
		.split('/')
		.filter(|segment| !segment.is_empty())
		.filter(|segment| !is_version_segment(segment))
		.collect::<Vec<_>>();

	match segments.as_slice() {
		[] => None,
		[collection] => Some((singular(collection), None)),
		[.., collection, identifier] if segments.len() % 2 == 0 =>
			Some((singular(collection), Some((*identifier).to_owned()))),
		[.., collection] => Some((singular(collection), None)),
	}
}

fn is_version_segment(segment: &str) -> bool {
	segment.len() > 1
		&& segment.starts_with('v')
		&& segment[1..].chars().all(|char| char.is_ascii_digit())
}

fn singular(collection: &str) -> String {
	if let Some(stem) = collection.strip_suffix("ies") {
		format!("{stem}y")
	} else if let Some(stem) = collection.strip_suffix('s') {
		stem.to_owned()
	} else {
		collection.to_owned()
	}
}
