//! Request stage attaching the bearer token.

// crates.io
use http::header::AUTHORIZATION;
// self
use crate::{_prelude::*, error::AuthFetchError, manager::TokenManager, transport::HttpRequest};

/// Sets `Authorization: Bearer <token>` on outbound gateway requests.
#[derive(Clone, Debug)]
pub struct AuthInjector {
	manager: TokenManager,
}
impl AuthInjector {
	/// Creates an injector drawing tokens from `manager`.
	pub fn new(manager: TokenManager) -> Self {
		Self { manager }
	}

	/// Token manager used to resolve credentials.
	pub fn manager(&self) -> &TokenManager {
		&self.manager
	}

	/// Resolves a token and attaches it, replacing any existing `Authorization` header.
	///
	/// Fails without modifying the request when no token can be obtained.
	pub async fn prepare(&self, mut request: HttpRequest) -> Result<HttpRequest, AuthFetchError> {
		let token = self.manager.ensure_token().await?;
		let value = token.authorization("Bearer").map_err(|_| AuthFetchError::MalformedResponse {
			message: "access_token contains characters not allowed in a header".into(),
		})?;

		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(request)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		acquire::{AcquireFuture, TokenAcquirer},
		auth::TokenGrant,
		config::AuthConfig,
		error::TransportError,
		transport::{HttpResponse, HttpTransport, TransportFuture},
	};

	struct Offline;
	impl HttpTransport for Offline {
		fn send(&self, _request: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async { Err::<HttpResponse, _>(TransportError::TimedOut) })
		}
	}

	struct Issues(&'static str);
	impl TokenAcquirer for Issues {
		fn fetch(&self) -> AcquireFuture<'_> {
			Box::pin(async move { Ok(TokenGrant::new(self.0, Duration::hours(1))) })
		}
	}

	async fn injector(token: &'static str) -> AuthInjector {
		let manager = TokenManager::builder(AuthConfig::new(
			Url::parse("https://idp.example.com/token").expect("Fixture URL is valid."),
			"abc",
		))
		.with_transport(Arc::new(Offline))
		.with_acquirer(Arc::new(Issues(token)))
		.build()
		.await
		.expect("Manager should build.");

		AuthInjector::new(manager)
	}

	#[tokio::test]
	async fn prepare_replaces_existing_authorization() {
		let request = http::Request::get("https://gw.example.com/api/directorio/banks")
			.header(AUTHORIZATION, "Basic stale")
			.body(Vec::new())
			.expect("Request should build.");
		let prepared =
			injector("fresh").await.prepare(request).await.expect("Injection should succeed.");
		let values = prepared.headers().get_all(AUTHORIZATION).iter().collect::<Vec<_>>();

		assert_eq!(values.len(), 1);
		assert_eq!(values[0], "Bearer fresh");
		assert!(values[0].is_sensitive());
	}

	#[tokio::test]
	async fn prepare_rejects_tokens_that_cannot_be_headers() {
		let request = http::Request::get("https://gw.example.com/api/directorio/banks")
			.body(Vec::new())
			.expect("Request should build.");
		let err = injector("bad\ntoken")
			.await
			.prepare(request)
			.await
			.expect_err("Control characters cannot be sent.");

		assert!(matches!(err, AuthFetchError::MalformedResponse { .. }));
	}
}
