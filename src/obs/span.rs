// crates.io
use http::Method;
// self
#[cfg(feature = "tracing")] use crate::obs::FlowKind;
use crate::{
	_prelude::*,
	error::{AuthFetchError, GatewayError},
	gateway::GatewayDomain,
	store::StoreError,
};

/// Instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// The future itself when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span attached to one exchange or one gateway call.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Span covering one client-credentials exchange.
	pub fn exchange() -> Self {
		#[cfg(feature = "tracing")]
		{
			Self {
				span: tracing::info_span!(
					"gateway_auth.exchange",
					flow = FlowKind::TokenExchange.as_str()
				),
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			Self {}
		}
	}

	/// Span covering one authenticated call to `domain`.
	pub fn gateway(domain: GatewayDomain, method: &Method) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self {
				span: tracing::info_span!(
					"gateway_auth.call",
					flow = FlowKind::GatewayCall.as_str(),
					domain = domain.as_str(),
					method = %method
				),
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (domain, method);

			Self {}
		}
	}

	/// Attaches the span to `fut` without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn log_cache_hit() {
	#[cfg(feature = "tracing")]
	tracing::trace!("serving cached token");
}

pub(crate) fn log_refresh_joined() {
	#[cfg(feature = "tracing")]
	tracing::debug!("joining in-flight token refresh");
}

pub(crate) fn log_token_restored(expires_at: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	if let Some(expires_at) = expires_at {
		tracing::info!(%expires_at, "restored persisted token");
	}
	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

pub(crate) fn log_exchange_succeeded(expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::info!(%expires_at, "token exchange succeeded");
	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

pub(crate) fn log_exchange_failed(error: &AuthFetchError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "token exchange failed; cache cleared");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn log_lifetime_within_margin(lifetime: Duration, margin: Duration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		lifetime_secs = lifetime.whole_seconds(),
		margin_secs = margin.whole_seconds(),
		"token lifetime does not exceed the safety margin; it will be refreshed on every call"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (lifetime, margin);
}

pub(crate) fn log_store_failed(action: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(action, %error, "token persistence failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (action, error);
}

pub(crate) fn log_gateway_error(domain: GatewayDomain, error: &GatewayError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		domain = domain.as_str(),
		status = error.status,
		body = %error.body,
		"gateway call failed"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (domain, error);
}
