//! Domain-scoped clients for the four payment-switch gateways.
//!
//! Every gateway lives under the same base API URL with its own path segment. The clients share
//! one [`Pipeline`], so they share one token and one refresh.

// crates.io
use http::{
	HeaderValue, Method,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	error::ConfigError,
	manager::TokenManager,
	pipeline::Pipeline,
	transport::{HttpRequest, HttpTransport},
};

/// Logical backend services reachable through the switch's API gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayDomain {
	/// Core transaction processing.
	Switch,
	/// Participant institution directory.
	Directory,
	/// Accounts and ledger movements.
	Ledger,
	/// Clearing cycles and net positions.
	Compensation,
}
impl GatewayDomain {
	/// Every domain, in declaration order.
	pub const ALL: [Self; 4] = [Self::Switch, Self::Directory, Self::Ledger, Self::Compensation];

	/// Stable label used in logs and spans.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Switch => "switch",
			Self::Directory => "directory",
			Self::Ledger => "ledger",
			Self::Compensation => "compensation",
		}
	}

	/// Path segment appended to the base API URL.
	pub const fn path_segment(self) -> &'static str {
		match self {
			Self::Switch => "transacciones",
			Self::Directory => "directorio",
			Self::Ledger => "contabilidad",
			Self::Compensation => "compensacion",
		}
	}
}
impl Display for GatewayDomain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Base URL of one gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayDescriptor {
	/// Domain served under `base_url`.
	pub domain: GatewayDomain,
	/// Base URL; its path never ends with `/`.
	pub base_url: Url,
}
impl GatewayDescriptor {
	/// Appends the domain's path segment to `api_url`, ignoring any trailing slash, query, or
	/// fragment on it.
	pub fn under(api_url: &Url, domain: GatewayDomain) -> Result<Self, ConfigError> {
		if api_url.cannot_be_a_base() {
			return Err(ConfigError::CannotBeBase(api_url.to_string()));
		}

		let mut base_url = api_url.clone();

		base_url.set_path(&format!(
			"{}/{}",
			api_url.path().trim_end_matches('/'),
			domain.path_segment()
		));
		base_url.set_query(None);
		base_url.set_fragment(None);

		Ok(Self { domain, base_url })
	}

	/// Resolves `path` below the base URL and appends `params` to its query.
	///
	/// A leading `/` on `path` stays relative to the base path. A query already present in
	/// `path` is kept and `params` are URL-encoded after it. Dot segments are resolved, and a
	/// path that would resolve outside the base path is rejected.
	pub fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ConfigError> {
		let (route, query) = match path.split_once('?') {
			Some((route, query)) => (route, Some(query)),
			None => (path, None),
		};
		let base = self.base_url.path().trim_end_matches('/');
		let relative = route.trim_start_matches('/');
		let mut url = self.base_url.clone();

		if relative.is_empty() {
			url.set_path(base);
		} else {
			url.set_path(&format!("{base}/{relative}"));
		}

		let resolved = url.path();

		if resolved != base && !resolved.strip_prefix(base).is_some_and(|rest| rest.starts_with('/'))
		{
			return Err(ConfigError::PathEscapesBase(path.to_owned()));
		}

		url.set_query(query.filter(|q| !q.is_empty()));

		if !params.is_empty() {
			url.query_pairs_mut().extend_pairs(params);
		}

		Ok(url)
	}
}

/// Authenticated JSON client bound to one gateway.
#[derive(Clone, Debug)]
pub struct GatewayClient {
	descriptor: GatewayDescriptor,
	pipeline: Pipeline,
}
impl GatewayClient {
	/// Creates a client for `descriptor` dispatching through `pipeline`.
	pub fn new(descriptor: GatewayDescriptor, pipeline: Pipeline) -> Self {
		Self { descriptor, pipeline }
	}

	/// Gateway this client talks to.
	pub fn descriptor(&self) -> &GatewayDescriptor {
		&self.descriptor
	}

	/// Domain this client talks to.
	pub fn domain(&self) -> GatewayDomain {
		self.descriptor.domain
	}

	/// Issues a `GET`.
	pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
		self.send(Method::GET, path, None, params).await
	}

	/// Issues a `POST` with an optional JSON body.
	pub async fn post(
		&self,
		path: &str,
		body: Option<&Value>,
		params: &[(&str, &str)],
	) -> Result<Value> {
		self.send(Method::POST, path, body, params).await
	}

	/// Issues a `PATCH` with an optional JSON body.
	pub async fn patch(
		&self,
		path: &str,
		body: Option<&Value>,
		params: &[(&str, &str)],
	) -> Result<Value> {
		self.send(Method::PATCH, path, body, params).await
	}

	/// Sends an arbitrary request through the pipeline and returns the parsed response body.
	pub async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
		params: &[(&str, &str)],
	) -> Result<Value> {
		let request = self.request(method, path, body, params)?;

		self.pipeline.dispatch(self.descriptor.domain, request).await
	}

	fn request(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
		params: &[(&str, &str)],
	) -> Result<HttpRequest, ConfigError> {
		let url = self.descriptor.endpoint(path, params)?;
		let mut builder = http::Request::builder()
			.method(method)
			.uri(url.as_str())
			.header(ACCEPT, HeaderValue::from_static("application/json"));

		if body.is_some() {
			builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}

		Ok(builder.body(body.map(|value| value.to_string().into_bytes()).unwrap_or_default())?)
	}
}

/// The four gateway clients, sharing one pipeline and one token manager.
#[derive(Clone, Debug)]
pub struct GatewayClientSet {
	/// Transaction processing client.
	pub switch: GatewayClient,
	/// Institution directory client.
	pub directory: GatewayClient,
	/// Ledger client.
	pub ledger: GatewayClient,
	/// Clearing and compensation client.
	pub compensation: GatewayClient,
}
impl GatewayClientSet {
	/// Builds all four clients under `config.api_url`.
	pub fn new(
		config: &GatewayConfig,
		manager: TokenManager,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError> {
		let pipeline = Pipeline::new(manager, transport);
		let client = |domain| -> Result<GatewayClient, ConfigError> {
			Ok(GatewayClient::new(config.descriptor(domain)?, pipeline.clone()))
		};

		Ok(Self {
			switch: client(GatewayDomain::Switch)?,
			directory: client(GatewayDomain::Directory)?,
			ledger: client(GatewayDomain::Ledger)?,
			compensation: client(GatewayDomain::Compensation)?,
		})
	}

	/// Builds all four clients reusing the manager's own transport.
	pub fn with_manager(config: &GatewayConfig, manager: TokenManager) -> Result<Self, ConfigError> {
		let transport = manager.transport();

		Self::new(config, manager, transport)
	}

	/// Selects the client serving `domain`.
	pub fn client(&self, domain: GatewayDomain) -> &GatewayClient {
		match domain {
			GatewayDomain::Switch => &self.switch,
			GatewayDomain::Directory => &self.directory,
			GatewayDomain::Ledger => &self.ledger,
			GatewayDomain::Compensation => &self.compensation,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::header::AUTHORIZATION;
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		acquire::{AcquireFuture, TokenAcquirer},
		auth::TokenGrant,
		config::AuthConfig,
		transport::{HttpResponse, TransportFuture},
	};

	struct Issues;
	impl TokenAcquirer for Issues {
		fn fetch(&self) -> AcquireFuture<'_> {
			Box::pin(async { Ok(TokenGrant::new("gw-token", Duration::hours(1))) })
		}
	}

	/// Answers every request with a JSON summary of what it received.
	struct Mirror;
	impl HttpTransport for Mirror {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			let header = |name: http::HeaderName| {
				request.headers().get(name).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned)
			};
			let summary = json!({
				"method": request.method().as_str(),
				"uri": request.uri().to_string(),
				"authorization": header(AUTHORIZATION),
				"content_type": header(CONTENT_TYPE),
				"body": String::from_utf8_lossy(request.body()),
			});

			Box::pin(async move { Ok(HttpResponse::new(summary.to_string().into_bytes())) })
		}
	}

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Fixture URL is valid.")
	}

	async fn clients(api_url: &str) -> GatewayClientSet {
		let manager =
			TokenManager::builder(AuthConfig::new(url("https://idp.example.com/token"), "abc"))
				.with_transport(Arc::new(Mirror))
				.with_acquirer(Arc::new(Issues))
				.build()
				.await
				.expect("Manager should build.");

		GatewayClientSet::with_manager(&GatewayConfig::new(url(api_url)), manager)
			.expect("Clients should build.")
	}

	#[test]
	fn descriptors_append_domain_segment() {
		for api_url in ["https://gw.example.com/api", "https://gw.example.com/api/"] {
			let descriptor = GatewayDescriptor::under(&url(api_url), GatewayDomain::Ledger)
				.expect("Descriptor should build.");

			assert_eq!(descriptor.base_url.as_str(), "https://gw.example.com/api/contabilidad");
		}

		let root = GatewayDescriptor::under(&url("http://localhost"), GatewayDomain::Switch)
			.expect("Descriptor should build.");

		assert_eq!(root.base_url.as_str(), "http://localhost/transacciones");

		let err = GatewayDescriptor::under(&url("mailto:ops@example.com"), GatewayDomain::Switch)
			.expect_err("Opaque URLs cannot carry a path.");

		assert!(matches!(err, ConfigError::CannotBeBase(_)));
	}

	#[test]
	fn endpoints_stay_under_the_base_path() {
		let descriptor =
			GatewayDescriptor::under(&url("https://gw.example.com/api"), GatewayDomain::Directory)
				.expect("Descriptor should build.");

		assert_eq!(
			descriptor.endpoint("/instituciones", &[]).expect("Path is relative.").as_str(),
			"https://gw.example.com/api/directorio/instituciones"
		);
		assert_eq!(
			descriptor
				.endpoint("instituciones/BANKEC01/operaciones?nuevoEstado=SUSPENDIDO", &[])
				.expect("Path is relative.")
				.as_str(),
			"https://gw.example.com/api/directorio/instituciones/BANKEC01/operaciones?nuevoEstado=SUSPENDIDO"
		);
		assert_eq!(
			descriptor.endpoint("", &[("q", "a b&c")]).expect("Empty path is the base.").as_str(),
			"https://gw.example.com/api/directorio?q=a+b%26c"
		);
	}

	#[test]
	fn endpoints_reject_paths_escaping_the_base() {
		let descriptor =
			GatewayDescriptor::under(&url("https://gw.example.com/api"), GatewayDomain::Directory)
				.expect("Descriptor should build.");

		for path in [
			"../../admin/secret",
			"/..",
			"instituciones/../../contabilidad/cuentas",
			"%2e%2e/transacciones",
			"..\\..\\admin",
		] {
			let err = descriptor.endpoint(path, &[]).expect_err("Path must stay under the base.");

			assert!(matches!(err, ConfigError::PathEscapesBase(ref p) if p == path));
		}

		assert_eq!(
			descriptor
				.endpoint("instituciones/../participantes", &[])
				.expect("Dot segments inside the base are fine.")
				.as_str(),
			"https://gw.example.com/api/directorio/participantes"
		);
	}

	#[tokio::test]
	async fn escaping_path_fails_before_any_request() {
		let set = clients("https://gw.example.com/api").await;
		let err = set.ledger.get("../transacciones/pagos", &[]).await.expect_err("Path escapes.");

		assert!(matches!(err, Error::Config(ConfigError::PathEscapesBase(_))));
		assert_eq!(set.ledger.pipeline.manager().metrics().exchanges(), 0);
	}

	#[tokio::test]
	async fn each_client_targets_its_own_domain() {
		let set = clients("https://gw.example.com/api").await;

		for domain in GatewayDomain::ALL {
			let client = set.client(domain);
			let echoed = client.get("/health", &[]).await.expect("Call should succeed.");

			assert_eq!(client.domain(), domain);
			assert_eq!(
				echoed["uri"],
				format!("https://gw.example.com/api/{}/health", domain.path_segment())
			);
			assert_eq!(echoed["authorization"], "Bearer gw-token");
		}
	}

	#[tokio::test]
	async fn post_serializes_body_and_params() {
		let set = clients("https://gw.example.com/api/").await;
		let echoed = set
			.ledger
			.post(
				"/ledger/movimientos",
				Some(&json!({ "codigoBic": "BANKEC01", "monto": 10 })),
				&[("dryRun", "true")],
			)
			.await
			.expect("Call should succeed.");

		assert_eq!(echoed["method"], "POST");
		assert_eq!(
			echoed["uri"],
			"https://gw.example.com/api/contabilidad/ledger/movimientos?dryRun=true"
		);
		assert_eq!(echoed["content_type"], "application/json");
		assert_eq!(
			serde_json::from_str::<Value>(echoed["body"].as_str().expect("Body is echoed."))
				.expect("Body is JSON."),
			json!({ "codigoBic": "BANKEC01", "monto": 10 })
		);

		let echoed = set
			.directory
			.patch("/instituciones/BANKEC01/operaciones", None, &[("nuevoEstado", "ACTIVO")])
			.await
			.expect("Call should succeed.");

		assert_eq!(echoed["method"], "PATCH");
		assert_eq!(echoed["content_type"], Value::Null);
		assert_eq!(echoed["body"], "");
	}
}
