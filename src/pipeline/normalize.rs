//! Response stage turning gateway answers into JSON values or [`GatewayError`]s.

// self
use crate::{_prelude::*, error::GatewayError, gateway::GatewayDomain, obs, transport::HttpResponse};

/// Converts non-success responses into [`GatewayError`] and parses success bodies.
///
/// The token cache is never consulted or modified here; a 401 from a gateway is reported to
/// the caller like any other status.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorNormalizer;
impl ErrorNormalizer {
	/// Parses a 2xx body or fails with the status and parsed body.
	pub fn on_response(
		&self,
		domain: GatewayDomain,
		response: HttpResponse,
	) -> Result<Value, GatewayError> {
		let status = response.status();
		let body = parse_body(response.body());

		if status.is_success() {
			return Ok(body);
		}

		let error = GatewayError { status: status.as_u16(), body };

		obs::log_gateway_error(domain, &error);

		Err(error)
	}
}

/// Empty bodies become `null`; bodies that are not JSON are kept as a JSON string.
pub fn parse_body(bytes: &[u8]) -> Value {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Value::Null;
	}

	serde_json::from_slice(bytes)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
