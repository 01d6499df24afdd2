//! Shared fixtures for the integration suites.

#![allow(dead_code)]

// std
use std::{env, path::PathBuf, process, sync::Arc};
// crates.io
use httpmock::{Mock, prelude::*};
use time::OffsetDateTime;
use url::Url;
// self
use gateway_auth::{
	config::{AuthConfig, GatewayConfig},
	manager::{TokenManager, TokenManagerBuilder},
	transport::{HttpTransport, ReqwestTransport},
};

/// `base64("console:s3cret")`.
pub const BASIC_CREDENTIAL: &str = "Y29uc29sZTpzM2NyZXQ=";
/// Path of the mocked identity endpoint.
pub const TOKEN_PATH: &str = "/oauth2/token";

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Fixture URL should parse.")
}

pub fn auth_config(server: &MockServer) -> AuthConfig {
	AuthConfig::new(url(&server.url(TOKEN_PATH)), BASIC_CREDENTIAL)
}

pub fn gateway_config(server: &MockServer) -> GatewayConfig {
	GatewayConfig::new(url(&server.url("/api")))
}

pub fn transport() -> Arc<dyn HttpTransport> {
	Arc::new(ReqwestTransport::default())
}

pub fn manager_builder(server: &MockServer) -> TokenManagerBuilder {
	TokenManager::builder(auth_config(server)).with_transport(transport())
}

pub async fn manager(server: &MockServer) -> TokenManager {
	manager_builder(server).build().await.expect("Token manager should build.")
}

/// Mocks a successful exchange returning `token` valid for `expires_in` seconds.
pub async fn mock_token<'a>(server: &'a MockServer, token: &str, expires_in: i64) -> Mock<'a> {
	let body = format!(
		r#"{{"access_token":"{token}","token_type":"Bearer","expires_in":{expires_in}}}"#
	);

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", format!("Basic {BASIC_CREDENTIAL}"))
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(50))
				.body(body);
		})
		.await
}

pub fn temp_path(tag: &str) -> PathBuf {
	let unique = format!(
		"gateway_auth_it_{tag}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique)
}
