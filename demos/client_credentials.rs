//! Demonstrates loading client registrations from JSON, reusing cached service tokens with the
//! default reqwest transport and in-memory store, and introspecting the issued token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_token_manager::{
	client::ClientRegistry,
	http::ReqwestHttpClient,
	introspection::ReqwestIntrospectionClient,
	manager::{ClientCredentialsTokenManager, ManagerSettings, TokenRequestOptions},
	oauth::{OAuth2TokenEndpoint, ReqwestTransportErrorMapper},
	reqwest::Client,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let _introspection_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/introspect");
			then.status(200).header("content-type", "application/json").body(
				"{\"active\":true,\"client_id\":\"demo-client\",\"scope\":\"email.read profile.read\",\"exp\":4102444800}",
			);
		})
		.await;
	let document = format!(
		r#"{{"clients":[{{
			"name": "router",
			"token_endpoint": "{}",
			"introspection_endpoint": "{}",
			"client_id": "demo-client",
			"credential": {{ "method": "client_secret_basic", "client_secret": "super-secret" }},
			"scope": "email.read profile.read",
			"allow_insecure_http": true
		}}]}}"#,
		server.url("/token"),
		server.url("/introspect"),
	);
	let registry = ClientRegistry::from_json_slice(document.as_bytes())?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let endpoint = <OAuth2TokenEndpoint<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		http_client.clone(),
		ReqwestTransportErrorMapper,
	);
	let manager = ClientCredentialsTokenManager::new(Arc::new(endpoint), Arc::new(MemoryStore::default()))
		.with_registry(registry)
		.with_settings(ManagerSettings::default().with_cache_key_prefix("demo"));
	let record = manager.get_token("router", TokenRequestOptions::new()).await?;
	let reused = manager.get_token("router", TokenRequestOptions::new()).await?;

	println!("Reusable access token: {}.", record.access_token.expose());
	println!("Second call served from cache: {}.", reused.access_token == record.access_token);

	token_mock.assert_async().await;

	let registration = manager.registry().resolve("router")?;
	let introspection = ReqwestIntrospectionClient::for_registration(
		registration,
		http_client,
		ReqwestTransportErrorMapper,
	)?;
	let result = introspection.introspect(record.access_token.expose(), Some("access_token")).await?;

	println!("Active: {}, scopes: {:?}, expires: {:?}.", result.active(), result.scopes(), result.expiration());

	Ok(())
}
