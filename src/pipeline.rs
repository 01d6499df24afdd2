//! Ordered request pipeline shared by every gateway client.
//!
//! Each call runs [`AuthInjector`], then the [`HttpTransport`], then [`ErrorNormalizer`]. The
//! order is fixed: a request never reaches the transport without a bearer token, and a response
//! never reaches the caller without being normalized.

pub mod inject;
pub mod normalize;

pub use inject::AuthInjector;
pub use normalize::ErrorNormalizer;

// self
use crate::{
	_prelude::*,
	gateway::GatewayDomain,
	manager::TokenManager,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	transport::{HttpRequest, HttpTransport},
};

/// Authenticated dispatch through one transport.
#[derive(Clone)]
pub struct Pipeline {
	injector: AuthInjector,
	transport: Arc<dyn HttpTransport>,
	normalizer: ErrorNormalizer,
}
impl Pipeline {
	/// Creates a pipeline that authenticates through `manager` and dispatches over `transport`.
	pub fn new(manager: TokenManager, transport: Arc<dyn HttpTransport>) -> Self {
		Self { injector: AuthInjector::new(manager), transport, normalizer: ErrorNormalizer }
	}

	/// Token manager backing the injector.
	pub fn manager(&self) -> &TokenManager {
		self.injector.manager()
	}

	/// Runs `request` through every stage and returns the parsed response body.
	pub async fn dispatch(&self, domain: GatewayDomain, request: HttpRequest) -> Result<Value> {
		const KIND: FlowKind = FlowKind::GatewayCall;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let span = FlowSpan::gateway(domain, request.method());
		let outcome = span
			.instrument(async {
				let request = self.injector.prepare(request).await?;
				let response = self.transport.send(request).await?;

				obs::record_gateway_status(domain, response.status().as_u16());

				Ok::<_, Error>(self.normalizer.on_response(domain, response)?)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&outcome));

		outcome
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline").field("injector", &self.injector).finish()
	}
}
