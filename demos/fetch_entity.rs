//! Fetches a catalog entity from a mock Port API with client credentials, showing that the
//! access token is fetched once and reused by later calls.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
// self
use port_sdk::{Client, ClientConfig, Credentials, Error, RequestOptions};

#[derive(Debug, Deserialize)]
struct EntityEnvelope {
	entity: Entity,
}

#[derive(Debug, Deserialize)]
struct Entity {
	identifier: String,
	title: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/auth/access_token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"accessToken": "demo-access",
				"expiresIn": 3600,
				"tokenType": "Bearer"
			}));
		})
		.await;
	let entity_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/blueprints/service/entities/checkout")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"ok": true,
				"entity": { "identifier": "checkout", "title": "Checkout Service" }
			}));
		})
		.await;
	let _missing_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/blueprints/service/entities/ghost");
			then.status(404).json_body(json!({
				"ok": false,
				"error": "not_found",
				"message": "Entity was not found.",
				"details": { "identifier": "ghost" }
			}));
		})
		.await;
	let config = ClientConfig::builder()
		.credentials(Credentials::client_credentials("demo-client", "demo-secret"))
		.base_url(server.base_url())
		.timeout(Duration::from_secs(5))
		.build()?;
	let client = Client::new(config)?;
	let envelope: EntityEnvelope =
		client.get("/v1/blueprints/service/entities/checkout", RequestOptions::new()).await?;

	println!("Fetched {} ({}).", envelope.entity.title, envelope.entity.identifier);

	match client
		.get::<EntityEnvelope>("/v1/blueprints/service/entities/ghost", RequestOptions::new())
		.await
	{
		Err(Error::NotFound { resource_type, identifier, .. }) => println!(
			"Missing {} `{}`.",
			resource_type.unwrap_or_default(),
			identifier.unwrap_or_default()
		),
		other => println!("Unexpected outcome: {other:?}."),
	}

	token_mock.assert_async().await;
	entity_mock.assert_async().await;

	Ok(())
}
