//! Static configuration for the identity exchange and the gateway base URL.
//!
//! Everything here is resolved once at startup and treated as read-only afterwards.
//! [`Settings::from_env`] reads the process environment; [`Settings::from_lookup`] accepts any
//! lookup function so callers and tests can feed values from elsewhere.

// std
use std::path::PathBuf;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::DEFAULT_SAFETY_MARGIN,
	error::ConfigError,
	gateway::{GatewayDescriptor, GatewayDomain},
};

/// Base API URL used when none is configured; the console is served behind a proxy at `/api`.
pub const DEFAULT_API_URL: &str = "http://localhost/api";

/// Environment variable names read by [`Settings::from_env`].
pub mod env {
	/// Base API URL shared by the four gateways.
	pub const API_URL: &str = "GATEWAY_API_URL";
	/// Identity endpoint for the client-credentials exchange.
	pub const TOKEN_ENDPOINT: &str = "GATEWAY_TOKEN_ENDPOINT";
	/// Pre-encoded Basic credential.
	pub const BASIC_CREDENTIAL: &str = "GATEWAY_BASIC_CREDENTIAL";
	/// Client identifier, used with [`CLIENT_SECRET`] when no Basic credential is given.
	pub const CLIENT_ID: &str = "GATEWAY_CLIENT_ID";
	/// Client secret paired with [`CLIENT_ID`].
	pub const CLIENT_SECRET: &str = "GATEWAY_CLIENT_SECRET";
	/// Requested OAuth scope.
	pub const SCOPE: &str = "GATEWAY_SCOPE";
	/// Safety margin in whole seconds.
	pub const TOKEN_MARGIN_SECS: &str = "GATEWAY_TOKEN_MARGIN_SECS";
	/// Optional path of the persisted token file.
	pub const TOKEN_CACHE: &str = "GATEWAY_TOKEN_CACHE";
}

/// Identity-endpoint settings for the client-credentials exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
	/// Identity endpoint receiving the form-encoded grant.
	pub token_endpoint: Url,
	/// Credential sent as `Authorization: Basic <credential>`, already base64-encoded.
	pub basic_credential: TokenSecret,
	/// Requested scope; omitted from the grant when empty.
	pub scope: String,
	/// Time subtracted from each reported lifetime to refresh ahead of real expiry.
	pub safety_margin: Duration,
}
impl AuthConfig {
	/// Creates a configuration from a pre-encoded Basic credential.
	pub fn new(token_endpoint: Url, basic_credential: impl Into<TokenSecret>) -> Self {
		Self {
			token_endpoint,
			basic_credential: basic_credential.into(),
			scope: String::new(),
			safety_margin: DEFAULT_SAFETY_MARGIN,
		}
	}

	/// Creates a configuration by encoding `client_id:client_secret` as the Basic credential.
	pub fn from_client_credentials(
		token_endpoint: Url,
		client_id: &str,
		client_secret: &str,
	) -> Self {
		Self::new(token_endpoint, encode_basic(client_id, client_secret))
	}

	/// Sets the requested scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the safety margin (defaults to 60 seconds); negative values clamp to zero.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}
}

/// Location of the four gateways.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
	/// Base API URL; each domain appends its own path segment.
	pub api_url: Url,
}
impl GatewayConfig {
	/// Creates a configuration rooted at `api_url`.
	pub fn new(api_url: Url) -> Self {
		Self { api_url }
	}

	/// Parses `api_url` into a configuration.
	pub fn parse(api_url: &str) -> Result<Self, ConfigError> {
		Ok(Self::new(parse_url(api_url)?))
	}

	/// Builds the descriptor for one domain.
	pub fn descriptor(&self, domain: GatewayDomain) -> Result<GatewayDescriptor, ConfigError> {
		GatewayDescriptor::under(&self.api_url, domain)
	}
}

/// Complete startup configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
	/// Identity exchange settings.
	pub auth: AuthConfig,
	/// Gateway location settings.
	pub gateway: GatewayConfig,
	/// File used to persist the token across restarts; in-memory only when absent.
	pub token_cache: Option<PathBuf>,
}
impl Settings {
	/// Reads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads settings through `lookup`, which returns the value of a named variable.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let gateway =
			GatewayConfig::parse(get(env::API_URL).as_deref().unwrap_or(DEFAULT_API_URL))?;
		let token_endpoint = get(env::TOKEN_ENDPOINT)
			.ok_or(ConfigError::MissingSetting(env::TOKEN_ENDPOINT))
			.and_then(|raw| parse_url(&raw))?;
		let mut auth = match get(env::BASIC_CREDENTIAL) {
			Some(credential) => AuthConfig::new(token_endpoint, credential),
			None => {
				let client_id =
					get(env::CLIENT_ID).ok_or(ConfigError::MissingSetting(env::BASIC_CREDENTIAL))?;
				let client_secret =
					get(env::CLIENT_SECRET).ok_or(ConfigError::MissingSetting(env::CLIENT_SECRET))?;

				AuthConfig::from_client_credentials(token_endpoint, &client_id, &client_secret)
			},
		};

		if let Some(scope) = get(env::SCOPE) {
			auth = auth.with_scope(scope);
		}
		if let Some(raw) = get(env::TOKEN_MARGIN_SECS) {
			let secs = raw.parse::<u32>().map_err(|_| ConfigError::InvalidNumber {
				name: env::TOKEN_MARGIN_SECS,
				value: raw.clone(),
			})?;

			auth = auth.with_safety_margin(Duration::seconds(secs.into()));
		}

		Ok(Self { auth, gateway, token_cache: get(env::TOKEN_CACHE).map(PathBuf::from) })
	}
}

/// Encodes `client_id:client_secret` for HTTP Basic authentication.
pub fn encode_basic(client_id: &str, client_secret: &str) -> String {
	STANDARD.encode(format!("{client_id}:{client_secret}"))
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|source| ConfigError::InvalidUrl { value: value.to_owned(), source })
}
