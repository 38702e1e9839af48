//! Credential variants accepted by the client.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Credentials supplied once at client construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
	/// OAuth2 client credentials exchanged at the token endpoint.
	#[serde(rename_all = "camelCase")]
	ClientCredentials {
		/// Port client identifier.
		client_id: String,
		/// Port client secret.
		client_secret: Secret,
	},
	/// Pre-issued bearer token used as-is.
	#[serde(rename_all = "camelCase")]
	AccessToken {
		/// Bearer token value.
		access_token: Secret,
	},
}
impl Credentials {
	/// Builds client-credentials.
	pub fn client_credentials(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self::ClientCredentials {
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
		}
	}

	/// Builds pre-issued token credentials.
	pub fn access_token(token: impl Into<String>) -> Self {
		Self::AccessToken { access_token: Secret::new(token) }
	}

	/// Rejects empty credential values.
	pub fn validate(&self) -> Result<(), ConfigError> {
		match self {
			Self::ClientCredentials { client_id, client_secret } => {
				if client_id.trim().is_empty() {
					return Err(ConfigError::EmptyCredential { field: "client_id" });
				}
				if client_secret.is_blank() {
					return Err(ConfigError::EmptyCredential { field: "client_secret" });
				}

				Ok(())
			},
			Self::AccessToken { access_token } =>
				if access_token.is_blank() {
					Err(ConfigError::EmptyCredential { field: "access_token" })
				} else {
					Ok(())
				},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn deserializes_both_shapes() {
		let oauth: Credentials =
			serde_json::from_str(r#"{"clientId":"id","clientSecret":"secret"}"#)
				.expect("Client credentials should deserialize.");
		let token: Credentials = serde_json::from_str(r#"{"accessToken":"jwt"}"#)
			.expect("Access token credentials should deserialize.");

		assert_eq!(oauth, Credentials::client_credentials("id", "secret"));
		assert_eq!(token, Credentials::access_token("jwt"));
	}

	#[test]
	fn debug_never_prints_secrets() {
		let rendered = format!("{:?}", Credentials::client_credentials("id", "hunter2"));

		assert!(!rendered.contains("hunter2"));
	}

	#[test]
	fn validate_rejects_blank_values() {
		assert!(matches!(
			Credentials::client_credentials("", "secret").validate(),
			Err(ConfigError::EmptyCredential { field: "client_id" })
		));
		assert!(matches!(
			Credentials::client_credentials("id", " ").validate(),
			Err(ConfigError::EmptyCredential { field: "client_secret" })
		));
		assert!(matches!(
			Credentials::access_token("").validate(),
			Err(ConfigError::EmptyCredential { field: "access_token" })
		));
	}
}
