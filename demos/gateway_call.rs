//! Builds the four gateway clients from environment-style settings, served by a local mock, and
//! shows that concurrent calls across gateways share a single token exchange.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use gateway_auth::{
	config::{Settings, env},
	gateway::GatewayClientSet,
	manager::TokenManager,
	transport::ReqwestTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(r#"{"access_token":"demo-access","token_type":"Bearer","expires_in":900}"#);
		})
		.await;
	let health_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/transacciones/health")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(r#"{"status":"UP"}"#);
		})
		.await;
	let banks_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/directorio/instituciones");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"codigoBic":"BANKEC01","estado":"ACTIVO"}]"#);
		})
		.await;
	let api_url = server.url("/api");
	let token_endpoint = server.url("/oauth2/token");
	let settings = Settings::from_lookup(|name: &str| match name {
		env::API_URL => Some(api_url.clone()),
		env::TOKEN_ENDPOINT => Some(token_endpoint.clone()),
		env::CLIENT_ID => Some("console".into()),
		env::CLIENT_SECRET => Some("s3cret".into()),
		_ => None,
	})?;
	let transport = Arc::new(ReqwestTransport::with_timeout(std::time::Duration::from_secs(5))?);
	let manager = TokenManager::from_settings(&settings, transport.clone()).await?;
	let clients = GatewayClientSet::new(&settings.gateway, manager.clone(), transport)?;
	let (health, banks) = tokio::join!(
		clients.switch.get("/health", &[]),
		clients.directory.get("/instituciones", &[]),
	);

	println!("switch health: {}", health?);
	println!("directory institutions: {}", banks?);
	println!("token expires at: {:?}", manager.expires_at());
	println!("exchanges performed: {}", manager.metrics().exchanges());

	token_mock.assert_calls_async(1).await;
	health_mock.assert_async().await;
	banks_mock.assert_async().await;

	Ok(())
}
