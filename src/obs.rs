//! Observability hooks for token exchanges and gateway calls.
//!
//! Every hook compiles to a no-op when its feature is disabled.
//!
//! - `tracing` (default): a `gateway_auth.exchange` span around each client-credentials exchange,
//!   a `gateway_auth.call` span with `domain` and `method` fields around each gateway call, and
//!   events for cache hits, joined refreshes, exchange results, persistence failures, and
//!   normalized gateway errors. Token values are never recorded.
//! - `metrics`: `gateway_auth_flow_total{flow, outcome}` for every attempt/success/failure and
//!   `gateway_auth_gateway_responses_total{domain, status}` per response status class.

mod counter;
mod span;

pub use counter::*;
pub use span::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client-credentials exchange against the identity endpoint.
	TokenExchange,
	/// Authenticated call to one of the gateways.
	GatewayCall,
}
impl FlowKind {
	/// Label used in span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TokenExchange => "token_exchange",
			Self::GatewayCall => "gateway_call",
		}
	}
}

/// Outcome labels recorded for each flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Flow started.
	Attempt,
	/// Flow produced a value.
	Success,
	/// Flow ended in an error.
	Failure,
}
impl FlowOutcome {
	/// Label used in metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}

	/// Labels a finished flow by its result.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}
}
