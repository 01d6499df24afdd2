// self
use crate::{
	gateway::GatewayDomain,
	obs::{FlowKind, FlowOutcome},
};

/// Counts one flow outcome on the global metrics recorder.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"gateway_auth_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts one gateway response, labeled by domain and status class (`2xx`, `4xx`, ...).
pub fn record_gateway_status(domain: GatewayDomain, status: u16) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"gateway_auth_gateway_responses_total",
		"domain" => domain.as_str(),
		"status" => status_class(status)
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (domain, status);
}

#[cfg(any(test, feature = "metrics"))]
fn status_class(status: u16) -> &'static str {
	match status / 100 {
		1 => "1xx",
		2 => "2xx",
		3 => "3xx",
		4 => "4xx",
		5 => "5xx",
		_ => "other",
	}
}
