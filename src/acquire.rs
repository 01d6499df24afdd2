//! Client-credentials exchange against the identity endpoint.
//!
//! [`TokenAcquirer`] is the seam the refresh coordinator calls when the cache is empty or
//! expired. [`ClientCredentialsAcquirer`] is the production implementation: a form-encoded
//! `grant_type=client_credentials` POST authenticated with a static Basic credential. The
//! acquirer never touches the cache; applying the safety margin and clearing poisoned entries
//! is the caller's job.

// crates.io
use http::{
	HeaderValue, Method, Uri,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenGrant,
	config::AuthConfig,
	error::{AuthFetchError, ConfigError},
	transport::{HttpRequest, HttpTransport},
};

/// Longest token lifetime accepted from the identity endpoint.
pub const MAX_EXPIRES_IN: Duration = Duration::days(365);

/// Boxed future returned by [`TokenAcquirer::fetch`].
pub type AcquireFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenGrant, AuthFetchError>> + 'a + Send>>;

/// Obtains a fresh token grant from an identity provider.
pub trait TokenAcquirer
where
	Self: Send + Sync,
{
	/// Performs one exchange; every call hits the network.
	fn fetch(&self) -> AcquireFuture<'_>;
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: i64,
}

/// Performs the OAuth 2.0 client-credentials grant over an [`HttpTransport`].
pub struct ClientCredentialsAcquirer {
	token_uri: Uri,
	authorization: HeaderValue,
	form: Vec<u8>,
	transport: Arc<dyn HttpTransport>,
}
impl ClientCredentialsAcquirer {
	/// Prepares the exchange described by `config`.
	///
	/// Fails when the endpoint or credential cannot be expressed as HTTP request parts, so
	/// the exchange itself never fails for configuration reasons.
	pub fn new(config: &AuthConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, ConfigError> {
		let token_uri = config.token_endpoint.as_str().parse::<Uri>().map_err(http::Error::from)?;
		let authorization = config.basic_credential.authorization("Basic")?;

		Ok(Self { token_uri, authorization, form: encode_form(&config.scope), transport })
	}

	fn request(&self) -> HttpRequest {
		let mut request = HttpRequest::new(self.form.clone());

		*request.method_mut() = Method::POST;
		*request.uri_mut() = self.token_uri.clone();

		let headers = request.headers_mut();

		headers.insert(AUTHORIZATION, self.authorization.clone());
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		request
	}
}
impl TokenAcquirer for ClientCredentialsAcquirer {
	fn fetch(&self) -> AcquireFuture<'_> {
		Box::pin(async move {
			let response = self.transport.send(self.request()).await?;
			let status = response.status();

			if !status.is_success() {
				return Err(AuthFetchError::Rejected {
					status: status.as_u16(),
					body: String::from_utf8_lossy(response.body()).into_owned(),
				});
			}

			parse_token_response(response.body())
		})
	}
}
impl Debug for ClientCredentialsAcquirer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsAcquirer")
			.field("token_uri", &self.token_uri)
			.field("authorization", &"<redacted>")
			.finish()
	}
}

fn encode_form(scope: &str) -> Vec<u8> {
	let mut form = url::form_urlencoded::Serializer::new(String::new());

	form.append_pair("grant_type", "client_credentials");

	if !scope.is_empty() {
		form.append_pair("scope", scope);
	}

	form.finish().into_bytes()
}

fn parse_token_response(body: &[u8]) -> Result<TokenGrant, AuthFetchError> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let parsed: TokenResponse = serde_path_to_error::deserialize(de)
		.map_err(|e| AuthFetchError::MalformedResponse { message: e.to_string() })?;

	if parsed.access_token.is_empty() {
		return Err(AuthFetchError::MalformedResponse { message: "access_token is empty".into() });
	}
	if parsed.expires_in <= 0 || parsed.expires_in > MAX_EXPIRES_IN.whole_seconds() {
		return Err(AuthFetchError::MalformedResponse {
			message: format!(
				"expires_in must be within 1..={}, got {}",
				MAX_EXPIRES_IN.whole_seconds(),
				parsed.expires_in
			),
		});
	}

	let grant = TokenGrant::new(parsed.access_token, Duration::seconds(parsed.expires_in));

	// A token that cannot travel in a header would poison the cache until it expires.
	grant.access_token.authorization("Bearer").map_err(|_| AuthFetchError::MalformedResponse {
		message: "access_token contains characters not allowed in an HTTP header".into(),
	})?;

	Ok(grant)
}
